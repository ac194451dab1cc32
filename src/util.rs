use crate::scaling::Resolution;
use reqwest::Url;

/// Parse "WIDTHxHEIGHT" (also accepts `X` and `*`).
pub fn parse_resolution(s: &str) -> Option<Resolution> {
    let (width, height) = s.trim().split_once(['x', 'X', '*'])?;
    Some(Resolution::new(
        width.trim().parse().ok()?,
        height.trim().parse().ok()?,
    ))
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "[::1]"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}
