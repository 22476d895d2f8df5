use crate::data::value::{DataValue, ValueType};
use std::cmp::Ordering;

/// Compare two values under the column's declared type.
///
/// Both sides are coerced into `value_type` first. Ordering is:
/// null < coercible values < values that failed coercion. Values that
/// failed coercion are compared by their display text so the order stays
/// total and deterministic.
pub fn compare_values(a: &DataValue, b: &DataValue, value_type: ValueType) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    match (a.coerce(value_type), b.coerce(value_type)) {
        (Some(a), Some(b)) => compare_coerced(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}

fn compare_coerced(a: &DataValue, b: &DataValue) -> Ordering {
    match (a, b) {
        (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (DataValue::Integer(a), DataValue::Integer(b)) => a.cmp(b),
        (DataValue::String(a), DataValue::String(b)) => a.cmp(b),
        (DataValue::Boolean(a), DataValue::Boolean(b)) => a.cmp(b),
        (DataValue::DateTime(a), DataValue::DateTime(b)) => a.cmp(b),
        // coerce() always yields matching variants for one type
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_comparison_is_numeric() {
        // Lexicographically "10" < "9"
        assert_eq!(
            compare_values(&"10".into(), &"9".into(), ValueType::Number),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&DataValue::Integer(3), &"3.5".into(), ValueType::Number),
            Ordering::Less
        );
    }

    #[test]
    fn test_text_comparison_is_lexicographic() {
        assert_eq!(
            compare_values(&"10".into(), &"9".into(), ValueType::Text),
            Ordering::Less
        );
    }

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(
            compare_values(&DataValue::Null, &DataValue::Integer(1), ValueType::Number),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&DataValue::Null, &DataValue::Null, ValueType::Text),
            Ordering::Equal
        );
    }

    #[test]
    fn test_uncoercible_values_sort_last() {
        assert_eq!(
            compare_values(&"n/a".into(), &DataValue::Integer(100), ValueType::Number),
            Ordering::Greater
        );
    }

    #[test]
    fn test_date_comparison() {
        assert_eq!(
            compare_values(&"2024-02-01".into(), &"2023-12-31".into(), ValueType::Date),
            Ordering::Greater
        );
    }
}
