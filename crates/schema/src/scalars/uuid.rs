use once_cell::sync::Lazy;
use regex::Regex;
use value::ConstValue;

use super::{literal_kind, ScalarCodec, ScalarError};

static UUID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{8}(-?[0-9a-f]{4}){3}-?[0-9a-f]{12}$").expect("uuid pattern is valid"));

fn check(s: &str) -> Result<(), ScalarError> {
    if UUID.is_match(s) {
        Ok(())
    } else {
        Err(ScalarError::InvalidUuid)
    }
}

pub struct UuidType;

impl ScalarCodec for UuidType {
    fn name(&self) -> &str {
        "Uuid"
    }

    fn description(&self) -> Option<&str> {
        Some("The `Uuid` type validates by pattern")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        match &value {
            ConstValue::String(s) => check(s).map(|_| value),
            _ => Err(ScalarError::InvalidUuid),
        }
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        match value {
            ConstValue::String(s) => {
                let s = s.trim().to_lowercase();
                check(&s)?;
                Ok(ConstValue::String(s))
            },
            _ => Err(ScalarError::InvalidUuid),
        }
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        match literal {
            ConstValue::String(_) => self.parse_value(literal.clone()),
            other => Err(ScalarError::WrongLiteral {
                expected: "strings",
                got: literal_kind(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_cases_and_trims_input() {
        let parsed = UuidType
            .parse_value(ConstValue::String(" 3F2504E0-4F89-11D3-9A0C-0305E82C3301 ".into()))
            .unwrap();
        assert_eq!(parsed, ConstValue::String("3f2504e0-4f89-11d3-9a0c-0305e82c3301".into()));
    }

    #[test]
    fn dashes_are_optional() {
        assert!(UuidType
            .parse_value(ConstValue::String("3f2504e04f8911d39a0c0305e82c3301".into()))
            .is_ok());
        assert_eq!(
            UuidType.serialize(ConstValue::String("not-a-uuid".into())).unwrap_err(),
            ScalarError::InvalidUuid
        );
    }
}
