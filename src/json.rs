use serde_json::Value;

pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(text) = as_string(v) {
                return Some(text);
            }
        }
    }
    None
}

/// Ids come back as numbers from the game API and as strings when used as object keys.
pub fn as_u64(value: &Value) -> Option<u64> {
    if let Some(num) = value.as_u64() {
        return Some(num);
    }
    if let Some(num) = value.as_f64() {
        if num.is_finite() && num >= 0.0 && num.fract() == 0.0 {
            return Some(num as u64);
        }
    }
    value.as_str().and_then(|s| s.trim().parse::<u64>().ok())
}

pub fn pick_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(as_u64)
}

pub fn pick_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().filter_map(|key| value.get(*key)).find_map(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|n| n.is_finite()).map(|n| n as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
    })
}

pub fn as_f64(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    num.is_finite().then_some(num)
}

pub fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(as_f64)
}

/// Listing payloads arrive either as an array or as an object keyed by id.
/// Object entries are returned with their key so callers can recover the id.
pub fn entries(value: Option<&Value>) -> Vec<(Option<String>, &Value)> {
    match value {
        Some(Value::Array(items)) => items.iter().map(|item| (None, item)).collect(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (Some(k.clone()), v)).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pickers_accept_numbers_and_numeric_strings() {
        let v = json!({"id": "42", "score": "2.5", "name": "  ", "alt": "Bob"});
        assert_eq!(pick_u64(&v, &["id"]), Some(42));
        assert_eq!(pick_f64(&v, &["score"]), Some(2.5));
        assert_eq!(pick_string(&v, &["name", "alt"]), Some("Bob".to_string()));
        assert_eq!(pick_u64(&v, &["missing"]), None);
    }

    #[test]
    fn entries_handle_arrays_and_objects() {
        let arr = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(entries(Some(&arr)).len(), 2);
        let obj = json!({"7": {"a": 1}});
        let rows = entries(Some(&obj));
        assert_eq!(rows[0].0.as_deref(), Some("7"));
        assert!(entries(Some(&json!(null))).is_empty());
    }
}
