use parser::Pos;
use rolegate_schema::PathSegment;
use serde::Serialize;
use value::ConstValue;

use crate::ExecutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorExtensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    /// Offending input field, for clients that highlight form fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
}

impl ErrorExtensions {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.field.is_none() && self.debug_message.is_none()
    }
}

/// The client-facing error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedError {
    pub message: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,

    #[serde(skip_serializing_if = "ErrorExtensions::is_empty")]
    pub extensions: ErrorExtensions,
}

impl FormattedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: ErrorExtensions::default(),
        }
    }
}

impl From<&ExecutionError> for FormattedError {
    /// Message, locations and path only, no extensions.
    fn from(err: &ExecutionError) -> Self {
        Self {
            message: err.message.clone(),
            locations: err.locations.iter().copied().map(Location::from).collect(),
            path: err.path.clone(),
            extensions: ErrorExtensions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ConstValue>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FormattedError>,
}

impl Response {
    pub fn from_errors(errors: Vec<FormattedError>) -> Self {
        Self { data: None, errors }
    }
}

type ErrorFormatter<'f> = Box<dyn FnMut(&ExecutionError) -> FormattedError + 'f>;

/// Outcome of one execution, before errors are turned into envelopes.
pub struct ExecutionResult<'f> {
    /// `None` when execution never started.
    pub data: Option<ConstValue>,
    pub errors: Vec<ExecutionError>,
    formatter: Option<ErrorFormatter<'f>>,
}

impl ExecutionResult<'static> {
    pub fn new(data: Option<ConstValue>, errors: Vec<ExecutionError>) -> Self {
        Self {
            data,
            errors,
            formatter: None,
        }
    }

    pub fn from_errors(errors: Vec<ExecutionError>) -> Self {
        Self::new(None, errors)
    }
}

impl<'f> ExecutionResult<'f> {
    /// Replace the default formatting of every error, which keeps message,
    /// locations and path only.
    pub fn set_error_formatter<'g, F>(self, formatter: F) -> ExecutionResult<'g>
    where
        F: FnMut(&ExecutionError) -> FormattedError + 'g,
    {
        ExecutionResult {
            data: self.data,
            errors: self.errors,
            formatter: Some(Box::new(formatter)),
        }
    }

    pub fn into_response(self) -> Response {
        let errors = match self.formatter {
            Some(mut formatter) => self.errors.iter().map(|err| formatter(err)).collect(),
            None => self.errors.iter().map(FormattedError::from).collect(),
        };
        Response {
            data: self.data,
            errors,
        }
    }
}
