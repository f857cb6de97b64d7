use serde_json::{Map, Value};

/// Decide whether a sample should be emitted when its value may be zero.
///
/// Returns `true` when the value is meaningful. A zero counter whose sibling
/// `cnt` is missing or zero means "no observations" and is suppressed.
pub fn can_be_zero(
    metric_name: &str,
    metric_value: Option<&Value>,
    attributes: &Map<String, Value>,
) -> bool {
    if metric_name.to_ascii_lowercase().contains("last") {
        return true;
    }
    let Some(value) = metric_value.filter(|v| !is_empty(v)) else {
        return false;
    };
    if is_zero(value) {
        return match attributes.get("cnt") {
            Some(cnt) if !is_empty(cnt) => !is_zero(cnt),
            _ => false,
        };
    }
    true
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// Upstream reports the same zero as "0", 0, "0.000000" or 0.0
fn is_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => {
            s == "0" || s == "0.000000" || s.trim().parse::<f64>().is_ok_and(|f| f == 0.0)
        }
        _ => false,
    }
}
