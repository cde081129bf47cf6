//! Lenient field access on loosely typed backend records.
//!
//! Records come straight from JSON endpoints, so a numeric column may arrive
//! as a number, a localized string (`"1.234,5"`) or not at all. Nothing here
//! fails: unreadable values become zero or "no category".

use serde_json::{Map, Value};

/// One row as returned by the backend.
pub type Record = Map<String, Value>;

/// Field used for the measure when the requested one is absent.
pub const COUNT_FIELD: &str = "count";

/// Trimmed textual value of `field`, or `None` when missing, null or blank.
pub fn category(record: &Record, field: &str) -> Option<String> {
    let text = match record.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Numeric value of `field`, if present and readable.
pub fn number(record: &Record, field: &str) -> Option<f64> {
    let parsed = match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Measure of a record: `value_key`, else [`COUNT_FIELD`], else zero.
pub fn measure(record: &Record, value_key: &str) -> f64 {
    number(record, value_key)
        .or_else(|| number(record, COUNT_FIELD))
        .unwrap_or(0.0)
}

/// Parses plain and localized numbers: `1234.5`, `1,234.5`, `1.234,5`,
/// `$ 1.234`, `12,5`.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '$' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => {
            let commas = cleaned.matches(',').count();
            let decimals = cleaned.len() - last_comma.map_or(0, |i| i + 1);
            if commas == 1 && decimals != 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test records must be objects"),
        }
    }

    #[test]
    fn reads_numbers_in_several_shapes() {
        let r = record(json!({
            "plain": 12.5,
            "text": "  40 ",
            "us": "1,234.5",
            "co": "1.234,5",
            "money": "$ 2.500.000",
            "decimal_comma": "12,5",
            "thousands_comma": "12,500",
            "junk": "n/a",
            "flag": true
        }));

        assert_eq!(number(&r, "plain"), Some(12.5));
        assert_eq!(number(&r, "text"), Some(40.0));
        assert_eq!(number(&r, "us"), Some(1234.5));
        assert_eq!(number(&r, "co"), Some(1234.5));
        assert_eq!(number(&r, "money"), Some(2_500_000.0));
        assert_eq!(number(&r, "decimal_comma"), Some(12.5));
        assert_eq!(number(&r, "thousands_comma"), Some(12_500.0));
        assert_eq!(number(&r, "junk"), None);
        assert_eq!(number(&r, "flag"), None);
        assert_eq!(number(&r, "missing"), None);
    }

    #[test]
    fn measure_falls_back_to_count_then_zero() {
        assert_eq!(measure(&record(json!({"saldo": 7, "count": 2})), "saldo"), 7.0);
        assert_eq!(measure(&record(json!({"count": 2})), "saldo"), 2.0);
        assert_eq!(measure(&record(json!({"saldo": null})), "saldo"), 0.0);
    }

    #[test]
    fn category_stringifies_scalars_and_skips_blanks() {
        let r = record(json!({"s": " Norte ", "n": 3, "b": false, "blank": "  ", "null": null}));

        assert_eq!(category(&r, "s").as_deref(), Some("Norte"));
        assert_eq!(category(&r, "n").as_deref(), Some("3"));
        assert_eq!(category(&r, "b").as_deref(), Some("false"));
        assert_eq!(category(&r, "blank"), None);
        assert_eq!(category(&r, "null"), None);
        assert_eq!(category(&r, "missing"), None);
    }
}
