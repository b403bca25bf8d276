use value::ConstValue;

use super::{literal_kind, print_safe_json, ScalarCodec, ScalarError};

pub const VARCHAR_LENGTH: usize = 255;

fn check(value: ConstValue) -> Result<ConstValue, ScalarError> {
    match &value {
        ConstValue::String(s) if s.chars().count() > VARCHAR_LENGTH => Err(ScalarError::TooLong(VARCHAR_LENGTH)),
        ConstValue::String(_) => Ok(value),
        other => Err(ScalarError::NotAString(print_safe_json(other))),
    }
}

/// A string limited to 255 characters.
pub struct Varchar;

impl ScalarCodec for Varchar {
    fn name(&self) -> &str {
        "Varchar"
    }

    fn description(&self) -> Option<&str> {
        Some("string limited to 255 characters")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        check(value)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        check(value)
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        match literal {
            ConstValue::String(_) => check(literal.clone()),
            other => Err(ScalarError::WrongLiteral {
                expected: "strings",
                got: literal_kind(other),
            }),
        }
    }
}
