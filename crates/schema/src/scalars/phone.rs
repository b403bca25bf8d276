use value::ConstValue;

use super::{as_text, print_safe_json, ScalarCodec, ScalarError};

const COUNTRY_CODE: &str = "380";
const PHONE_LENGTH: usize = 12;

/// Digits only, left-padded with as much of the country code as needed.
fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < PHONE_LENGTH {
        let missing = (PHONE_LENGTH - digits.len()).min(COUNTRY_CODE.len());
        format!("{}{}", &COUNTRY_CODE[..missing], digits)
    } else {
        digits
    }
}

fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarError> {
    let unrepresentable = || ScalarError::Unrepresentable {
        kind: "`phone`",
        value: print_safe_json(value),
    };
    let phone = normalize(&as_text(value).ok_or_else(unrepresentable)?);
    if phone.len() != PHONE_LENGTH {
        return Err(unrepresentable());
    }
    Ok(ConstValue::String(phone))
}

/// Twelve digit phone number, e.g. `380981234567`.
pub struct PhoneType;

impl ScalarCodec for PhoneType {
    fn name(&self) -> &str {
        "Phone"
    }

    fn description(&self) -> Option<&str> {
        Some("The `phone` is a string consisting of only 12 digits. Example: \"380981234567\"")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        if value == ConstValue::Null {
            return Ok(value);
        }
        coerce(&value)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        if value == ConstValue::Null {
            return Ok(value);
        }
        coerce(&value)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("380981234567", "380981234567")]
    #[test_case("+38 (098) 123-45-67", "380981234567")]
    #[test_case("0981234567", "380981234567")]
    #[test_case("981234567", "380981234567")]
    fn normalizes(input: &str, expected: &str) {
        assert_eq!(
            PhoneType.parse_value(ConstValue::String(input.into())).unwrap(),
            ConstValue::String(expected.into())
        );
    }

    #[test_case("12345")]
    #[test_case("3809812345678")]
    fn rejects(input: &str) {
        let err = PhoneType.serialize(ConstValue::String(input.into())).unwrap_err();
        assert!(err.to_string().starts_with("Cannot represent following value as `phone`"));
    }
}
