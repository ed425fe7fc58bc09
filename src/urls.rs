/// Resolve a backend-provided URL against the API base.
///
/// Absolute URLs pass through untouched; relative paths are joined with
/// exactly one `/` between base and path. Empty input yields `None`.
pub fn normalize_url(base: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_absolute(raw) {
        return Some(raw.to_string());
    }
    if let Some(rest) = raw.strip_prefix("//") {
        let scheme = base
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
            .unwrap_or("http");
        return Some(format!("{scheme}://{rest}"));
    }
    Some(join(base, raw))
}

/// Build an endpoint URL such as `/api/videos/` against the API base.
pub fn api_url(base: &str, path: &str) -> String {
    join(base, path)
}

pub fn is_absolute(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        return format!("{base}/");
    }
    format!("{base}/{path}")
}
