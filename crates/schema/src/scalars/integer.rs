use value::ConstValue;

use super::{literal_kind, print_safe_json, ScalarCodec, ScalarError};

fn as_int(value: &ConstValue) -> Option<i64> {
    match value {
        ConstValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        ConstValue::String(s) => s.trim().parse().ok(),
        ConstValue::Boolean(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn coerce(value: &ConstValue, kind: &'static str, accept: fn(i64) -> bool) -> Result<ConstValue, ScalarError> {
    match as_int(value) {
        Some(n) if accept(n) => Ok(ConstValue::from(n)),
        _ => Err(ScalarError::Unrepresentable {
            kind,
            value: print_safe_json(value),
        }),
    }
}

fn int_literal<'a>(literal: &'a ConstValue, expected: &'static str) -> Result<&'a ConstValue, ScalarError> {
    match literal {
        ConstValue::Number(n) if n.is_i64() || n.is_u64() => Ok(literal),
        other => Err(ScalarError::WrongLiteral {
            expected,
            got: literal_kind(other),
        }),
    }
}

/// Integers strictly greater than zero.
pub struct PositiveIntType;

impl ScalarCodec for PositiveIntType {
    fn name(&self) -> &str {
        "PositiveInt"
    }

    fn description(&self) -> Option<&str> {
        Some("The `PositiveInt` type accepts only positive integers (not zero)")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value, "positive integer", |n| n > 0)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value, "positive integer", |n| n > 0)
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(int_literal(literal, "integers")?, "positive integer", |n| n > 0)
    }
}

/// Zero and positive integers.
pub struct UIntType;

impl ScalarCodec for UIntType {
    fn name(&self) -> &str {
        "UnsignedInteger"
    }

    fn description(&self) -> Option<&str> {
        Some("The `Unsigned integer` type accepts only positive integers and zero")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value, "unsigned integer", |n| n >= 0)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(&value, "unsigned integer", |n| n >= 0)
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        coerce(int_literal(literal, "unsigned integers")?, "unsigned integer", |n| n >= 0)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(ConstValue::from(1), true)]
    #[test_case(ConstValue::from(0), false)]
    #[test_case(ConstValue::from(-5), false)]
    #[test_case(ConstValue::String("7".into()), true)]
    fn positive(value: ConstValue, ok: bool) {
        assert_eq!(PositiveIntType.parse_value(value).is_ok(), ok);
    }

    #[test]
    fn unsigned_accepts_zero() {
        assert_eq!(UIntType.serialize(ConstValue::from(0)).unwrap(), ConstValue::from(0));
        assert_eq!(
            UIntType.parse_value(ConstValue::from(-1)).unwrap_err().to_string(),
            "Cannot represent following value as unsigned integer: -1"
        );
    }

    #[test]
    fn literal_kind_is_checked() {
        assert_eq!(
            PositiveIntType
                .parse_literal(&ConstValue::String("3".into()))
                .unwrap_err()
                .to_string(),
            "Query error: Can only parse integers, got: StringValue"
        );
    }
}
