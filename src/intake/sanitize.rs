//! Field sanitization.

use serde_json::Value;

pub const NAME_MAX: usize = 100;
pub const PHONE_MAX: usize = 30;
pub const EMAIL_MAX: usize = 120;
pub const REGION_MAX: usize = 50;

/// Coerce a raw form value to a trimmed string of at most `max_chars` characters.
///
/// Missing and `null` become the empty string. Numbers and booleans are
/// rendered as text; arrays and objects as their JSON text. Never fails.
pub fn sanitize(raw: Option<&Value>, max_chars: usize) -> String {
    let text = match raw {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    };

    text.trim().chars().take(max_chars).collect()
}
