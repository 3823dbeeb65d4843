//! Endpoint URL normalization and connection URL construction.

/// Normalizes a base endpoint URL by collapsing runs of redundant path
/// separators, preserving the scheme's `://`.
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim();
    let (scheme, rest) = match trimmed.find("://") {
        Some(idx) => trimmed.split_at(idx + 3),
        None => ("", trimmed),
    };

    let mut normalized = String::with_capacity(trimmed.len());
    normalized.push_str(scheme);

    let mut previous_was_slash = false;
    for ch in rest.chars() {
        if ch == '/' {
            if previous_was_slash {
                continue;
            }
            previous_was_slash = true;
        } else {
            previous_was_slash = false;
        }
        normalized.push(ch);
    }

    normalized
}

/// Builds the outbound connection URL with the bearer token appended as a
/// query credential.
pub fn connection_url(endpoint: &str, token: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}token={token}")
}
