//! Normalization of raw request payloads into canonical records.
//!
//! Derivation is deterministic: the same raw event always yields the same
//! canonical record, which is what makes re-processing idempotent at the
//! upsert layer.

use netlens_domain::constants::{MAX_PAGE_URL_LENGTH, MAX_RESOURCE_TYPE_LENGTH, MAX_URL_LENGTH};
use netlens_domain::{CanonicalRecord, EventCategory, RawEvent};
use url::Url;

/// Why a raw event was skipped instead of transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    pub event_id: String,
    pub reason: String,
}

/// Coarse status classification used for logging and diagnostics.
pub fn status_class(status: u16) -> &'static str {
    match status {
        0 => "pending",
        100..=199 => "informational",
        200..=299 => "success",
        300..=399 => "redirect",
        400..=499 => "client_error",
        _ => "server_error",
    }
}

/// Derive a canonical record from a raw event.
///
/// Only `request` events materialize canonical records; other categories
/// feed rollups of their own in the source system and are skipped here.
/// Validation failures are per-event and never fatal to a batch.
pub fn normalize(event: &RawEvent) -> Result<CanonicalRecord, String> {
    if event.category != EventCategory::Request {
        return Err(format!("category {} is not transformable", event.category.as_str()));
    }

    let payload = event
        .payload
        .as_object()
        .ok_or_else(|| "payload is not a JSON object".to_string())?;

    let url = payload
        .get("url")
        .and_then(|value| value.as_str())
        .ok_or_else(|| "missing required field: url".to_string())?;
    let url = clamp(url, MAX_URL_LENGTH);

    let parsed = Url::parse(&url).map_err(|err| format!("malformed url: {err}"))?;
    let domain = parsed
        .host_str()
        .ok_or_else(|| "url has no host".to_string())?
        .to_ascii_lowercase();

    let method = payload
        .get("method")
        .and_then(|value| value.as_str())
        .unwrap_or("GET")
        .to_ascii_uppercase();

    let page_url = payload
        .get("pageUrl")
        .and_then(|value| value.as_str())
        .map(|value| clamp(value, MAX_PAGE_URL_LENGTH));

    let resource_type = payload
        .get("type")
        .and_then(|value| value.as_str())
        .map(|value| clamp(value, MAX_RESOURCE_TYPE_LENGTH).to_ascii_lowercase())
        .unwrap_or_else(|| "other".to_string());

    let status = payload
        .get("status")
        .and_then(|value| value.as_u64())
        .map(|value| u16::try_from(value).unwrap_or(0))
        .unwrap_or(0);

    let duration_ms = payload.get("durationMs").and_then(|v| v.as_i64()).unwrap_or(0).max(0);
    let size_bytes = payload.get("sizeBytes").and_then(|v| v.as_i64()).unwrap_or(0).max(0);
    let from_cache = payload.get("fromCache").and_then(|v| v.as_bool()).unwrap_or(false);

    Ok(CanonicalRecord {
        id: event.id.clone(),
        url,
        method,
        domain,
        page_url,
        resource_type,
        status,
        duration_ms,
        size_bytes,
        from_cache,
        timestamp: event.captured_at,
        created_at: event.captured_at,
        updated_at: event.captured_at,
    })
}

/// Truncate to at most `max_len` bytes, backing off to a char boundary.
fn clamp(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request_event(payload: serde_json::Value) -> RawEvent {
        RawEvent {
            id: "evt-1".to_string(),
            category: EventCategory::Request,
            payload,
            captured_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn normalizes_complete_request_payload() {
        let event = request_event(json!({
            "url": "https://A.com/x",
            "method": "post",
            "pageUrl": "https://a.com/",
            "type": "XHR",
            "status": 200,
            "durationMs": 120,
            "sizeBytes": 2048,
            "fromCache": false
        }));

        let record = normalize(&event).unwrap();
        assert_eq!(record.id, "evt-1");
        assert_eq!(record.domain, "a.com");
        assert_eq!(record.method, "POST");
        assert_eq!(record.resource_type, "xhr");
        assert_eq!(record.status, 200);
        assert_eq!(record.duration_ms, 120);
        assert_eq!(record.size_bytes, 2048);
        assert_eq!(record.timestamp, event.captured_at);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn applies_defaults_for_optional_fields() {
        let event = request_event(json!({"url": "https://a.com/x"}));
        let record = normalize(&event).unwrap();

        assert_eq!(record.method, "GET");
        assert_eq!(record.resource_type, "other");
        assert_eq!(record.status, 0);
        assert_eq!(record.duration_ms, 0);
        assert!(!record.from_cache);
        assert!(record.page_url.is_none());
    }

    #[test]
    fn rejects_missing_url() {
        let event = request_event(json!({"status": 200}));
        let err = normalize(&event).unwrap_err();
        assert!(err.contains("missing required field"));
    }

    #[test]
    fn rejects_malformed_url() {
        let event = request_event(json!({"url": "not a url"}));
        let err = normalize(&event).unwrap_err();
        assert!(err.contains("malformed url"));
    }

    #[test]
    fn rejects_non_request_categories() {
        let mut event = request_event(json!({"url": "https://a.com/x"}));
        event.category = EventCategory::WebVital;
        let err = normalize(&event).unwrap_err();
        assert!(err.contains("not transformable"));
    }

    #[test]
    fn clamps_oversized_url() {
        let long_path = "a".repeat(5000);
        let event = request_event(json!({"url": format!("https://a.com/{long_path}")}));
        let record = normalize(&event).unwrap();
        assert_eq!(record.url.len(), netlens_domain::constants::MAX_URL_LENGTH);
    }

    #[test]
    fn clamps_multibyte_url_at_a_char_boundary() {
        // 15-byte prefix plus 2-byte chars puts the byte limit mid-character.
        let long_path = "é".repeat(3000);
        let event = request_event(json!({"url": format!("https://a.com/x{long_path}")}));
        let record = normalize(&event).unwrap();
        assert!(record.url.len() <= netlens_domain::constants::MAX_URL_LENGTH);
        assert!(record.url.ends_with('é'));
    }

    #[test]
    fn derivation_is_deterministic() {
        let event = request_event(json!({
            "url": "https://a.com/x",
            "status": 503,
            "durationMs": 40
        }));
        assert_eq!(normalize(&event).unwrap(), normalize(&event).unwrap());
    }

    #[test]
    fn status_classes_cover_the_ranges() {
        assert_eq!(status_class(0), "pending");
        assert_eq!(status_class(204), "success");
        assert_eq!(status_class(301), "redirect");
        assert_eq!(status_class(404), "client_error");
        assert_eq!(status_class(500), "server_error");
    }
}
