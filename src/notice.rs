//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `skipped_notice`.
//! Role: Shared contract helper for CLI diagnostics (lenient drops, not errors).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

use crate::core::partition::Skipped;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub input: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("input".to_string(), json!(notice.input));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Summarize elements dropped by a lenient collection decode.
pub fn skipped_notice(cmd: &str, input: &str, time: String, skipped: &[Skipped]) -> Notice {
    let mut details = Map::new();
    details.insert("skipped_count".to_string(), json!(skipped.len()));
    details.insert(
        "indices".to_string(),
        json!(skipped.iter().map(|entry| entry.index).collect::<Vec<_>>()),
    );
    Notice {
        kind: "skip".to_string(),
        time,
        cmd: cmd.to_string(),
        input: input.to_string(),
        message: format!("skipped {} element(s) with unknown or malformed variants", skipped.len()),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json, skipped_notice};
    use crate::core::error::ErrorKind;
    use crate::core::partition::Skipped;
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let mut details = Map::new();
        details.insert("skipped_count".to_string(), Value::from(3));

        let notice = Notice {
            kind: "skip".to_string(),
            time: "2026-02-01T00:00:00Z".to_string(),
            cmd: "participants".to_string(),
            input: "users.json".to_string(),
            message: "skipped 3 element(s)".to_string(),
            details,
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(obj.get("kind").and_then(|v| v.as_str()), Some("skip"));
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-01T00:00:00Z")
        );
        assert_eq!(obj.get("cmd").and_then(|v| v.as_str()), Some("participants"));
        assert_eq!(obj.get("input").and_then(|v| v.as_str()), Some("users.json"));
        assert!(obj.get("details").and_then(|v| v.as_object()).is_some());
    }

    #[test]
    fn skipped_notice_lists_indices() {
        let skipped = vec![Skipped {
            index: 4,
            id: "x1".to_string(),
            tag: "bot".to_string(),
            reason: ErrorKind::UnrecognizedVariant,
            field: Some("type".to_string()),
        }];
        let notice = skipped_notice("chat", "-", "2026-02-01T00:00:00Z".to_string(), &skipped);
        assert_eq!(notice.details["skipped_count"], 1);
        assert_eq!(notice.details["indices"][0], 4);
        assert!(notice.message.starts_with("skipped 1"));
    }
}
