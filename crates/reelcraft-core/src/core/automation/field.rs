//! Field Access and Comparison
//!
//! Rules address element fields by dotted path over the element's JSON view
//! and compare with coercing semantics: `"5"` equals `5`, `true` equals `1`,
//! and `null` only equals a missing field.

use serde_json::{Map, Value};

use crate::core::template::{GeneratedElement, GeneratedTrack};

/// Builds the JSON view rules are evaluated against.
///
/// Adds the virtual fields `textContent`, `trackRole`, `trackType`,
/// `trackName` and `endTime` to the serialized element.
pub fn element_view(track: &GeneratedTrack, element: &GeneratedElement) -> Value {
    let mut view = match serde_json::to_value(element) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    if let Some(text) = element.content.as_text() {
        view.insert("textContent".to_string(), Value::from(text));
    }
    view.insert("trackRole".to_string(), Value::from(track.role.as_str()));
    view.insert(
        "trackType".to_string(),
        Value::from(track.track_type.to_string()),
    );
    view.insert("trackName".to_string(), Value::from(track.name.clone()));
    view.insert("endTime".to_string(), Value::from(element.end_time()));
    Value::Object(view)
}

/// Resolves a dotted path. Returns `None` for a missing segment.
///
/// `length` on a string counts characters and on an array counts items,
/// unless an object carries its own `length` key.
pub fn resolve_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root.clone();
    for segment in path.split('.') {
        current = match current {
            Value::Object(mut map) => map.remove(segment)?,
            Value::Array(items) => {
                if segment == "length" {
                    Value::from(items.len())
                } else {
                    let index: usize = segment.parse().ok()?;
                    items.into_iter().nth(index)?
                }
            }
            Value::String(s) if segment == "length" => Value::from(s.chars().count()),
            _ => return None,
        };
    }
    Some(current)
}

/// Coerces a value to a number. `None` (a missing field) is NaN.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_number(s),
        Some(Value::Array(_)) => parse_number(&to_text(value)),
        Some(Value::Object(_)) => f64::NAN,
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if s
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Coerces a value to its text form
pub fn to_text(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn format_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Loose equality between a field value and a condition value
pub fn loose_equals(field: Option<&Value>, expected: &Value) -> bool {
    let field = match field {
        None => return expected.is_null(),
        Some(v) => v,
    };
    match (field, expected) {
        (Value::Null, other) | (other, Value::Null) => other.is_null(),
        (Value::Number(_), Value::Number(_)) => {
            to_number(Some(field)) == to_number(Some(expected))
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(_), _) => loose_equals(
            Some(&Value::from(to_number(Some(field)))),
            expected,
        ),
        (_, Value::Bool(_)) => loose_equals(
            Some(field),
            &Value::from(to_number(Some(expected))),
        ),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(Some(field)) == to_number(Some(expected))
        }
        // Two distinct structures are never equal
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => false,
        (Value::Array(_) | Value::Object(_), primitive) => {
            loose_equals(Some(&Value::from(to_text(Some(field)))), primitive)
        }
        (primitive, Value::Array(_) | Value::Object(_)) => {
            loose_equals(Some(primitive), &Value::from(to_text(Some(expected))))
        }
    }
}

/// `contains`: array membership, otherwise substring of the text form
pub fn contains(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => items.iter().any(|item| loose_equals(Some(item), expected)),
        Some(other) => to_text(Some(other)).contains(&to_text(Some(expected))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_nested_and_length() {
        let view = json!({"style": {"fontSize": 48}, "textContent": "Hello", "tags": [1, 2, 3]});
        assert_eq!(resolve_path(&view, "style.fontSize"), Some(json!(48)));
        assert_eq!(resolve_path(&view, "textContent.length"), Some(json!(5)));
        assert_eq!(resolve_path(&view, "tags.length"), Some(json!(3)));
        assert_eq!(resolve_path(&view, "tags.1"), Some(json!(2)));
        assert_eq!(resolve_path(&view, "style.missing.deeper"), None);
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals(Some(&json!("5")), &json!(5)));
        assert!(loose_equals(Some(&json!(1)), &json!(true)));
        assert!(loose_equals(Some(&json!(0)), &json!("")));
        assert!(loose_equals(None, &json!(null)));
        assert!(!loose_equals(Some(&json!(0)), &json!(null)));
        assert!(!loose_equals(None, &json!("undefined")));
        assert!(loose_equals(Some(&json!([5])), &json!("5")));
        assert!(!loose_equals(Some(&json!("abc")), &json!(0)));
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(to_number(Some(&json!(" 12.5 "))), 12.5);
        assert_eq!(to_number(Some(&json!(""))), 0.0);
        assert!(to_number(Some(&json!("inf"))).is_nan());
        assert!(to_number(None).is_nan());
        assert_eq!(to_number(Some(&json!(true))), 1.0);
    }

    #[test]
    fn test_text_form_of_numbers() {
        assert_eq!(to_text(Some(&json!(5.0))), "5");
        assert_eq!(to_text(Some(&json!(2.5))), "2.5");
        assert_eq!(to_text(Some(&json!([1, null, "a"]))), "1,,a");
        assert_eq!(to_text(Some(&json!(1e19))), "10000000000000000000");
        assert_eq!(to_text(Some(&json!(-2e19))), "-20000000000000000000");
    }

    #[test]
    fn test_contains() {
        assert!(contains(Some(&json!("Breaking news")), &json!("news")));
        assert!(contains(Some(&json!(["a", "b"])), &json!("b")));
        assert!(contains(Some(&json!(12345)), &json!(234)));
        assert!(!contains(None, &json!("x")));
    }
}
