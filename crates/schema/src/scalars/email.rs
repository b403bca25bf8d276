use once_cell::sync::Lazy;
use regex::Regex;
use value::ConstValue;

use super::{literal_kind, print_safe_json, ScalarCodec, ScalarError};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && !s.contains(".@") && EMAIL.is_match(s)
}

/// Email address. Internal values are trusted on the way out.
pub struct EmailType;

impl ScalarCodec for EmailType {
    fn name(&self) -> &str {
        "Email"
    }

    fn description(&self) -> Option<&str> {
        Some("The `Email` type validates the syntax of an email address")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        Ok(value)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        match &value {
            ConstValue::String(s) if is_email(s) => Ok(value),
            _ => Err(ScalarError::Unrepresentable {
                kind: "email",
                value: print_safe_json(&value),
            }),
        }
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        match literal {
            ConstValue::String(s) if is_email(s) => Ok(literal.clone()),
            ConstValue::String(_) => Err(ScalarError::InvalidEmail),
            other => Err(ScalarError::WrongLiteral {
                expected: "strings",
                got: literal_kind(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("user@example.com", true)]
    #[test_case("first.last+tag@mail.example.org", true)]
    #[test_case("user@localhost", false)]
    #[test_case("user.example.com", false)]
    #[test_case("user@@example.com", false)]
    #[test_case(".user@example.com", false)]
    fn validates_syntax(input: &str, ok: bool) {
        assert_eq!(EmailType.parse_value(ConstValue::String(input.to_string())).is_ok(), ok);
    }

    #[test]
    fn literal_must_be_a_string() {
        let err = EmailType.parse_literal(&ConstValue::from(42)).unwrap_err();
        assert_eq!(err.to_string(), "Query error: Can only parse strings, got: IntValue");
        assert_eq!(
            EmailType.parse_literal(&ConstValue::String("nope".into())).unwrap_err(),
            ScalarError::InvalidEmail
        );
    }
}
