//! CSV rendering for audit log exports
//!
//! Deliberately small: the consuming compliance tooling expects this exact
//! dialect. Header row equals the key set of the first record; fields
//! containing the delimiter, a quote, or a line break are quoted with
//! embedded quotes doubled; an empty result renders as an empty string.

use serde_json::Value;

/// One export row as ordered key/value pairs.
///
/// Pairs rather than a map so the column order is stable and the header
/// follows the first row exactly.
pub type Row = Vec<(&'static str, Value)>;

/// Renders rows to CSV text. Empty input yields an empty string.
pub fn to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut out = String::new();
    let header: Vec<String> = first.iter().map(|(key, _)| escape(key)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in rows {
        let fields: Vec<String> = row.iter().map(|(_, value)| escape(&render(value))).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Flattens a JSON value into its CSV cell text.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested payloads become compact JSON inside the cell
        other => other.to_string(),
    }
}

/// Quotes a field when it contains the delimiter, a quote, or a line break.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_rows_yield_empty_string() {
        assert_eq!(to_csv(&[]), "");
    }

    #[test]
    fn test_header_comes_from_first_row() {
        let rows = vec![vec![
            ("id", json!(1)),
            ("action", json!("update_user")),
            ("success", json!(true)),
        ]];
        let csv = to_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,action,success"));
        assert_eq!(lines.next(), Some("1,update_user,true"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_one_line_per_row() {
        let rows = vec![
            vec![("action", json!("a"))],
            vec![("action", json!("b"))],
            vec![("action", json!("c"))],
        ];
        assert_eq!(to_csv(&rows).lines().count(), 4);
    }

    #[test]
    fn test_comma_in_field_is_quoted() {
        let rows = vec![vec![("description", json!("updated name, email"))]];
        assert_eq!(to_csv(&rows), "description\n\"updated name, email\"\n");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let rows = vec![vec![("description", json!(r#"set name to "Sam""#))]];
        assert_eq!(
            to_csv(&rows),
            "description\n\"set name to \"\"Sam\"\"\"\n"
        );
    }

    #[test]
    fn test_newline_in_field_is_quoted() {
        let rows = vec![vec![("notes", json!("line one\nline two"))]];
        assert_eq!(to_csv(&rows), "notes\n\"line one\nline two\"\n");
    }

    #[test]
    fn test_null_renders_as_empty_field() {
        let rows = vec![vec![("a", json!("x")), ("b", Value::Null), ("c", json!("y"))]];
        assert_eq!(to_csv(&rows), "a,b,c\nx,,y\n");
    }

    #[test]
    fn test_nested_payload_renders_as_json() {
        let rows = vec![vec![("action_data", json!({"field": "status"}))]];
        let csv = to_csv(&rows);
        // The JSON cell carries quotes, so it arrives quoted and doubled
        assert_eq!(csv, "action_data\n\"{\"\"field\"\":\"\"status\"\"}\"\n");
    }
}
