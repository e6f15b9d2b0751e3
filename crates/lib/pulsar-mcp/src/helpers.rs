use std::fmt;

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content};
use serde_json::Value;

pub(crate) const DEFAULT_MAX_MESSAGES: u32 = 10;
pub(crate) const MAX_MESSAGES: u32 = 100;

/// Wraps a JSON envelope as a successful tool result.
pub(crate) fn envelope(value: Value) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

/// Error envelope: delivered as tool output with `status: error`, never as
/// a protocol-level error.
pub(crate) fn error_envelope(message: impl fmt::Display) -> Result<CallToolResult, ErrorData> {
    envelope(serde_json::json!({
        "status": "error",
        "message": message.to_string(),
    }))
}

/// Resolves an argument against its configured default. The `Err` carries
/// the validation message; callers surface it without a backend call.
pub(crate) fn require_arg(
    value: Option<String>,
    default: Option<&str>,
    name: &str,
) -> Result<String, String> {
    value
        .filter(|value| !value.trim().is_empty())
        .or_else(|| default.map(str::to_string))
        .ok_or_else(|| format!("{name} is required"))
}

/// Clamps a requested batch size into the supported range.
pub(crate) fn clamp_max_messages(requested: Option<u32>) -> usize {
    requested.unwrap_or(DEFAULT_MAX_MESSAGES).clamp(1, MAX_MESSAGES) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_applies_default_and_bounds() {
        assert_eq!(clamp_max_messages(None), 10);
        assert_eq!(clamp_max_messages(Some(0)), 1);
        assert_eq!(clamp_max_messages(Some(42)), 42);
        assert_eq!(clamp_max_messages(Some(150)), 100);
    }

    #[test]
    fn require_arg_prefers_explicit_value() {
        assert_eq!(
            require_arg(Some("orders".to_string()), Some("fallback"), "topic"),
            Ok("orders".to_string())
        );
    }

    #[test]
    fn require_arg_falls_back_to_default() {
        assert_eq!(
            require_arg(None, Some("fallback"), "topic"),
            Ok("fallback".to_string())
        );
        assert_eq!(
            require_arg(Some("  ".to_string()), Some("fallback"), "topic"),
            Ok("fallback".to_string())
        );
    }

    #[test]
    fn require_arg_reports_missing_value() {
        assert_eq!(require_arg(None, None, "topic"), Err("topic is required".to_string()));
    }
}
