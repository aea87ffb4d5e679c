use axum::http::HeaderMap;

pub const FALLBACK_IDENTIFIER: &str = "127.0.0.1";

/// Identifies the caller for rate limiting.
///
/// Uses the first `x-forwarded-for` hop, then `x-real-ip`, then a fixed
/// loopback address. Both headers are client controlled, so a caller that
/// reaches the service without a trusted proxy can pick its own identity.
pub fn client_identifier(headers: &HeaderMap) -> String {
    forwarded_for(headers)
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_else(|| FALLBACK_IDENTIFIER.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_string())
}

fn header_value(headers: &HeaderMap, key: &str) -> Option<String> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.to_string())
}
