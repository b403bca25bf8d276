use rolegate_executor::{ExecutionError, FormattedError};
use rolegate_schema::FieldErrorKind;

use crate::{LogAction, LogRecord, RequestScope};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// The client-facing envelope of `err`.
///
/// Code and offending field are copied from the underlying fault. Internal
/// faults hide their message unless `debug` is set, in which case the original
/// message travels in `extensions.debugMessage`. File paths and traces never
/// leave the log.
pub fn format_error(err: &ExecutionError, debug: bool) -> FormattedError {
    let mut formatted = FormattedError::from(err);
    if let Some(source) = &err.source {
        formatted.extensions.code = source.code();
        formatted.extensions.field = source.field().map(ToString::to_string);
        if source.kind == FieldErrorKind::Internal {
            formatted.message = INTERNAL_MESSAGE.to_string();
        }
    }
    if debug {
        formatted.extensions.debug_message = Some(err.message.clone());
    }
    formatted
}

/// Text of every `error` record.
pub(crate) fn fault_text(message: &str, file: &str, line: u32, code: i32) -> String {
    format!("Message: {message}; File: {file}; Line: {line}; Code: {code}")
}

/// The `error` record logged for `err`, with source location and trace.
pub fn error_record(scope: &RequestScope, err: &ExecutionError) -> LogRecord {
    let mut record = scope.record(LogAction::Error);
    record.error = Some(fault_text(&err.message, err.file(), err.line(), err.code().unwrap_or_default()));
    record.trace = err.trace();
    record
}
