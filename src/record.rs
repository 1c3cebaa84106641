use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Application-level messages are cut to this many characters; the full
/// text survives in `trace` for error records.
pub const MESSAGE_LIMIT: usize = 100;

/// Which side of the system produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClass {
    /// Ad-hoc message logged by the hosting service.
    Application,
    /// Request pair for a call that arrived without a correlation header.
    ClientRequest,
    /// Request pair for a peer-to-peer call carrying a correlation header.
    ServiceRequest,
}

/// One structured record, built once and emitted immediately.
///
/// Optional fields are skipped during serialization so each record class
/// only carries its own shape: application records have `host`/`pid` and
/// possibly `trace`, request/response records carry the HTTP detail
/// fields and identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub class: RecordClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Build an application-class record from a caller-supplied level and
    /// message.
    ///
    /// Multi-line input (stack traces) is folded into a single line and
    /// truncated to [`MESSAGE_LIMIT`] characters; when `level` is
    /// `"error"` the full untruncated text is preserved in `trace`.
    pub fn application(level: &str, message: &str) -> Self {
        let flattened = collapse_multiline(message);
        let truncated = truncate_chars(&flattened, MESSAGE_LIMIT);
        let trace = if level.eq_ignore_ascii_case("error") {
            Some(flattened)
        } else {
            None
        };

        LogRecord {
            class: RecordClass::Application,
            host: local_hostname(),
            pid: Some(std::process::id()),
            severity: level.to_ascii_uppercase(),
            message: truncated,
            request_id: None,
            correlation_id: None,
            trace,
            client: None,
            path: None,
            method: None,
            status: None,
            request_time: None,
            response_time: None,
            resolution_time: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// `ERROR` for any status in the 4xx/5xx range, `INFO` otherwise.
pub fn severity_for_status(status: u16) -> &'static str {
    if status >= 400 {
        "ERROR"
    } else {
        "INFO"
    }
}

/// Fold newline-plus-indentation runs into single spaces.
///
/// Stack traces arrive as `"...\n    at ..."`; collapsing the newline and
/// the indentation that follows keeps the record on one line. A newline
/// followed by fewer than two whitespace characters is left untouched.
pub fn collapse_multiline(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(['\r', '\n']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let nl = if tail.starts_with("\r\n") { 2 } else { 1 };
        let after = &tail[nl..];
        let trimmed = after.trim_start_matches(char::is_whitespace);
        let ws = after.len() - trimmed.len();
        if ws >= 2 {
            out.push(' ');
            rest = trimmed;
        } else {
            out.push_str(&tail[..nl]);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Truncate to at most `limit` characters, respecting char boundaries.
pub fn truncate_chars(input: &str, limit: usize) -> String {
    match input.char_indices().nth(limit) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

fn local_hostname() -> Option<String> {
    hostname::get().ok().map(|h| h.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_boundary_at_400() {
        assert_eq!(severity_for_status(399), "INFO");
        assert_eq!(severity_for_status(400), "ERROR");
        assert_eq!(severity_for_status(200), "INFO");
        assert_eq!(severity_for_status(500), "ERROR");
    }

    #[test]
    fn application_message_is_truncated() {
        let long = "x".repeat(250);
        let record = LogRecord::application("info", &long);
        assert_eq!(record.message.chars().count(), MESSAGE_LIMIT);
        assert!(record.trace.is_none());
    }

    #[test]
    fn error_level_keeps_full_trace() {
        let long = "boom ".repeat(50);
        let record = LogRecord::application("error", &long);
        assert_eq!(record.severity, "ERROR");
        assert_eq!(record.message.chars().count(), MESSAGE_LIMIT);
        assert_eq!(record.trace.as_deref(), Some(long.as_str()));
    }

    #[test]
    fn application_record_carries_process_identity() {
        let record = LogRecord::application("warn", "disk almost full");
        assert_eq!(record.severity, "WARN");
        assert_eq!(record.pid, Some(std::process::id()));
        assert_eq!(record.class, RecordClass::Application);
    }

    #[test]
    fn collapse_folds_indented_continuations() {
        let trace = "Error: boom\n    at handler (app.js:10)\n    at next (router.js:5)";
        assert_eq!(
            collapse_multiline(trace),
            "Error: boom at handler (app.js:10) at next (router.js:5)"
        );
    }

    #[test]
    fn collapse_leaves_plain_newlines_alone() {
        assert_eq!(collapse_multiline("a\nb"), "a\nb");
        assert_eq!(collapse_multiline("a\r\nb"), "a\r\nb");
    }

    #[test]
    fn collapse_handles_crlf_runs() {
        assert_eq!(collapse_multiline("a\r\n   b"), "a b");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(150);
        let cut = truncate_chars(&s, 100);
        assert_eq!(cut.chars().count(), 100);
    }

    #[test]
    fn empty_message_is_fine() {
        let record = LogRecord::application("info", "");
        assert_eq!(record.message, "");
    }

    #[test]
    fn request_classes_serialize_snake_case() {
        let mut record = LogRecord::application("info", "x");
        record.class = RecordClass::ServiceRequest;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["class"], "service_request");
        record.class = RecordClass::ClientRequest;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["class"], "client_request");
    }

    #[test]
    fn absent_fields_are_skipped_in_json() {
        let record = LogRecord::application("info", "hello");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("status").is_none());
        assert!(json.get("resolution_time").is_none());
        assert_eq!(json["metadata"], serde_json::json!({}));
    }
}
