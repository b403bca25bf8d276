//! Value codecs for the custom scalars every schema gets for free.
//!
//! A codec is a pure function pair: `serialize` for values flowing out in a
//! response, `parse_value` for variables, `parse_literal` for values written
//! inline in the query document.

use std::sync::Arc;

use thiserror::Error;
use value::ConstValue;

mod datetime;
mod email;
mod integer;
mod lang;
mod phone;
mod uuid;
mod varchar;

pub use datetime::DatetimeType;
pub use email::EmailType;
pub use integer::{PositiveIntType, UIntType};
pub use lang::{LangType, DEFAULT_LANGUAGE};
pub use phone::PhoneType;
pub use uuid::UuidType;
pub use varchar::Varchar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScalarError {
    #[error("Cannot represent following value as {kind}: {value}")]
    Unrepresentable { kind: &'static str, value: String },

    #[error("Query error: Can only parse {expected}, got: {got}")]
    WrongLiteral { expected: &'static str, got: &'static str },

    #[error("Not a valid email")]
    InvalidEmail,

    #[error("This is not a valid UUID")]
    InvalidUuid,

    #[error("The parsed date was invalid")]
    InvalidDate,

    #[error("Date must be no earlier than {0}")]
    DateTooEarly(&'static str),

    #[error("String cannot be longer than {0} characters")]
    TooLong(usize),

    #[error("String cannot represent a non string value: {0}")]
    NotAString(String),

    #[error("Value {value} does not exist in \"{enum_name}\" enum.")]
    UnknownEnumValue { enum_name: &'static str, value: String },
}

pub trait ScalarCodec: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Internal value to response value.
    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError>;

    /// Variable value to internal value.
    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError>;

    /// Inline literal to internal value.
    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        self.parse_value(literal.clone())
    }
}

/// Codecs registered by every [`SchemaBuilder`](crate::SchemaBuilder).
pub fn standard() -> Vec<Arc<dyn ScalarCodec>> {
    vec![
        Arc::new(EmailType),
        Arc::new(DatetimeType),
        Arc::new(PositiveIntType),
        Arc::new(UIntType),
        Arc::new(LangType),
        Arc::new(Varchar),
        Arc::new(PhoneType),
        Arc::new(UuidType),
    ]
}

/// JSON rendering of a value for error messages.
pub(crate) fn print_safe_json(value: &ConstValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value}"))
}

/// AST kind of a literal, named the way GraphQL documents name them.
pub(crate) fn literal_kind(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "NullValue",
        ConstValue::Number(n) if n.is_f64() => "FloatValue",
        ConstValue::Number(_) => "IntValue",
        ConstValue::String(_) | ConstValue::Binary(_) => "StringValue",
        ConstValue::Boolean(_) => "BooleanValue",
        ConstValue::Enum(_) => "EnumValue",
        ConstValue::List(_) => "ListValue",
        ConstValue::Object(_) => "ObjectValue",
    }
}

/// Loose string view of a value: strings as-is, numbers in decimal.
pub(crate) fn as_text(value: &ConstValue) -> Option<String> {
    match value {
        ConstValue::String(s) => Some(s.clone()),
        ConstValue::Number(n) => Some(n.to_string()),
        ConstValue::Enum(name) => Some(name.to_string()),
        _ => None,
    }
}
