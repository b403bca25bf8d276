use value::{ConstValue, Name};

use super::{as_text, print_safe_json, ScalarCodec, ScalarError};

pub const DEFAULT_LANGUAGE: &str = "ru";
pub const LANGUAGES: [&str; 2] = ["ru", "ua"];

fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarError> {
    match as_text(value) {
        Some(lang) if LANGUAGES.contains(&lang.as_str()) => Ok(ConstValue::Enum(Name::new(lang))),
        _ => Err(ScalarError::UnknownEnumValue {
            enum_name: "Lang",
            value: print_safe_json(value),
        }),
    }
}

/// Interface language, an enum of `ru` and `ua`.
pub struct LangType;

impl ScalarCodec for LangType {
    fn name(&self) -> &str {
        "Lang"
    }

    fn description(&self) -> Option<&str> {
        Some("Language type")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_languages() {
        assert_eq!(
            LangType.parse_value(ConstValue::String("ua".into())).unwrap(),
            ConstValue::Enum(Name::new("ua"))
        );
        assert_eq!(
            LangType.parse_literal(&ConstValue::Enum(Name::new(DEFAULT_LANGUAGE))).unwrap(),
            ConstValue::Enum(Name::new("ru"))
        );
        assert!(LangType.parse_value(ConstValue::String("en".into())).is_err());
    }
}
