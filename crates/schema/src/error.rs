use std::{
    backtrace::{Backtrace, BacktraceStatus},
    fmt::{self, Display, Formatter},
    panic::Location,
    sync::Arc,
};

use thiserror::Error;

use crate::scalars::ScalarError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Type '{type_name}' is defined more than once.")]
    DuplicateType { type_name: String },

    #[error("Field '{type_name}.{field_name}' refers to unknown type '{referenced}'.")]
    UnknownType {
        type_name: String,
        field_name: String,
        referenced: String,
    },

    #[error(
        "Argument '{argument}' of field '{type_name}.{field_name}' must be an input type, but '{referenced}' is an \
         object type."
    )]
    ArgumentNotInput {
        type_name: String,
        field_name: String,
        argument: String,
        referenced: String,
    },

    #[error("Object type '{type_name}' must define at least one field.")]
    EmptyObject { type_name: String },

    #[error("Scalar '{name}' collides with a built-in or object type.")]
    ScalarConflict { name: String },
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Discriminates the faults a field resolution can raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A fault meant for the client, such as a permission or validation problem.
    User,

    /// A user fault that also names the offending input field, so that clients
    /// can highlight it.
    Extended { field: Option<String> },

    /// Anything that escaped from resolver internals.
    Internal,
}

/// The general fault type raised while resolving a field.
///
/// The place where the fault was constructed and a captured backtrace travel
/// with it. Both end up in the error log record only, never in the response.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub message: String,
    pub code: i32,
    pub kind: FieldErrorKind,
    location: &'static Location<'static>,
    trace: Arc<Backtrace>,
}

impl FieldError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(message, FieldErrorKind::User)
    }

    #[track_caller]
    pub fn extended(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::with_kind(
            message,
            FieldErrorKind::Extended {
                field: Some(field.into()),
            },
        )
    }

    #[track_caller]
    pub fn internal(err: impl Display) -> Self {
        Self::with_kind(err.to_string(), FieldErrorKind::Internal)
    }

    #[track_caller]
    pub fn permission_denied() -> Self {
        Self::new("Permission denied").with_code(401)
    }

    #[track_caller]
    fn with_kind(message: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            message: message.into(),
            code: 0,
            kind,
            location: Location::caller(),
            trace: Arc::new(Backtrace::capture()),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Numeric code, `None` when it was never set or set to zero.
    #[inline]
    pub fn code(&self) -> Option<i32> {
        (self.code != 0).then_some(self.code)
    }

    /// The offending input field of an extended fault.
    #[inline]
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            FieldErrorKind::Extended { field } => field.as_deref(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self.kind, FieldErrorKind::Extended { .. })
    }

    #[inline]
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.location.line()
    }

    /// The backtrace, when backtraces are enabled for this process.
    pub fn trace(&self) -> Option<String> {
        (self.trace.status() == BacktraceStatus::Captured).then(|| self.trace.to_string())
    }
}

impl PartialEq for FieldError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.code == other.code && self.kind == other.kind
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FieldError {}

impl From<ScalarError> for FieldError {
    #[track_caller]
    fn from(err: ScalarError) -> Self {
        FieldError::new(err.to_string())
    }
}
