//! Diff summaries for audit entries
//!
//! Only top-level fields are compared; nested values are summarized.

use serde_json::Value;

const MAX_STRING_CHARS: usize = 50;

/// Describe the top-level field changes between two serialized records
///
/// Returns `None` when nothing changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let changes = match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            let mut changes: Vec<String> = before_obj
                .iter()
                .filter_map(|(key, before_val)| match after_obj.get(key) {
                    Some(after_val) if after_val == before_val => None,
                    Some(after_val) => Some(format!(
                        "{}: {} -> {}",
                        key,
                        format_value(before_val),
                        format_value(after_val)
                    )),
                    None => Some(format!("{}: {} -> (removed)", key, format_value(before_val))),
                })
                .collect();

            changes.extend(
                after_obj
                    .iter()
                    .filter(|(key, _)| !before_obj.contains_key(*key))
                    .map(|(key, val)| format!("{}: (added) -> {}", key, format_value(val))),
            );
            changes
        }
        _ if before != after => vec![format!(
            "{} -> {}",
            format_value(before),
            format_value(after)
        )],
        _ => Vec::new(),
    };

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > MAX_STRING_CHARS => {
            // Names and notes are often non-ASCII; cut on char boundaries
            let head: String = s.chars().take(MAX_STRING_CHARS - 3).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_balance_change() {
        let before = json!({"name": "Main", "balanceYER": "1000"});
        let after = json!({"name": "Main", "balanceYER": "1500"});

        let diff = generate_diff(&before, &after).unwrap();
        assert_eq!(diff, "balanceYER: \"1000\" -> \"1500\"");
    }

    #[test]
    fn test_added_and_removed_fields() {
        let before = json!({"location": "other", "otherLocation": "Uncle"});
        let after = json!({"location": "me", "notes": "moved"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("location: \"other\" -> \"me\""));
        assert!(diff.contains("otherLocation: \"Uncle\" -> (removed)"));
        assert!(diff.contains("notes: (added) -> \"moved\""));
    }

    #[test]
    fn test_no_changes() {
        let value = json!({"amount": "200", "currency": "YER"});
        assert!(generate_diff(&value, &value).is_none());
    }

    #[test]
    fn test_long_non_ascii_string_is_truncated() {
        let before = json!({"description": "راتب".repeat(30)});
        let after = json!({"description": "short"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("...\""));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "null");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({"a": 1, "b": 2})), "{2 fields}");
    }
}
