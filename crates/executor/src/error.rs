use std::{
    fmt::{self, Display, Formatter},
    panic::Location,
};

use parser::Pos;
use rolegate_schema::{FieldError, PathSegment};

/// A fault surfaced by the engine: parse and validation failures, and field
/// faults annotated with where they happened in the document and response.
#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub message: String,
    pub locations: Vec<Pos>,
    pub path: Vec<PathSegment>,
    /// The resolver or coercion fault behind this error, if any.
    pub source: Option<FieldError>,
    origin: &'static Location<'static>,
}

impl ExecutionError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            source: None,
            origin: Location::caller(),
        }
    }

    #[track_caller]
    pub fn from_field_error(err: FieldError, pos: Pos, path: Vec<PathSegment>) -> Self {
        Self {
            message: err.message.clone(),
            locations: vec![pos],
            path,
            source: Some(err),
            origin: Location::caller(),
        }
    }

    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Pos>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Where the underlying fault was raised.
    pub fn file(&self) -> &'static str {
        self.source.as_ref().map_or(self.origin.file(), FieldError::file)
    }

    pub fn line(&self) -> u32 {
        self.source.as_ref().map_or(self.origin.line(), FieldError::line)
    }

    pub fn code(&self) -> Option<i32> {
        self.source.as_ref().and_then(FieldError::code)
    }

    pub fn trace(&self) -> Option<String> {
        self.source.as_ref().and_then(FieldError::trace)
    }
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err as _)
    }
}
