use serde_json::Value;

/// Render a profile attribute as a single display line.
pub fn value_to_string(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    sanitize(raw)
}

// Providers control these values; strip anything that could move the cursor.
fn sanitize(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}
