use chrono::{DateTime, NaiveDate, NaiveDateTime};
use value::ConstValue;

use super::{literal_kind, ScalarCodec, ScalarError};

pub const DATE_MIN: &str = "1970-01-01 00:00:00";

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn check(value: &ConstValue) -> Result<ConstValue, ScalarError> {
    let datetime = match value {
        ConstValue::String(s) => parse(s).ok_or(ScalarError::InvalidDate)?,
        _ => return Err(ScalarError::InvalidDate),
    };
    let min = NaiveDateTime::parse_from_str(DATE_MIN, OUTPUT_FORMAT).map_err(|_| ScalarError::InvalidDate)?;
    if datetime < min {
        return Err(ScalarError::DateTooEarly(DATE_MIN));
    }
    Ok(ConstValue::String(datetime.format(OUTPUT_FORMAT).to_string()))
}

/// Calendar date and time, no earlier than the Unix epoch.
pub struct DatetimeType;

impl ScalarCodec for DatetimeType {
    fn name(&self) -> &str {
        "Datetime"
    }

    fn description(&self) -> Option<&str> {
        Some("The `Datetime` type parses and validates a calendar date and time")
    }

    fn serialize(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        Ok(value)
    }

    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, ScalarError> {
        check(&value)
    }

    fn parse_literal(&self, literal: &ConstValue) -> Result<ConstValue, ScalarError> {
        match literal {
            ConstValue::String(_) => check(literal),
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

    #[test_case("2021-03-04 05:06:07", "2021-03-04 05:06:07")]
    #[test_case("2021-03-04", "2021-03-04 00:00:00")]
    #[test_case("2021-03-04T05:06:07+02:00", "2021-03-04 03:06:07")]
    fn normalizes(input: &str, expected: &str) {
        assert_eq!(
            DatetimeType.parse_value(ConstValue::String(input.into())).unwrap(),
            ConstValue::String(expected.into())
        );
    }

    #[test]
    fn rejects_impossible_and_early_dates() {
        assert_eq!(
            DatetimeType.parse_value(ConstValue::String("2021-02-30".into())).unwrap_err(),
            ScalarError::InvalidDate
        );
        assert_eq!(
            DatetimeType.parse_value(ConstValue::String("1969-12-31".into())).unwrap_err(),
            ScalarError::DateTooEarly(DATE_MIN)
        );
    }
}
