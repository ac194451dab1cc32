use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const DEBUG_PAYLOAD_ENV: &str = "DESKSURF_DEBUG_PAYLOAD";
const MAX_LOGGED_FRAME_CHARS: usize = 200;

/// Installs the global fmt subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `DESKSURF_DEBUG_PAYLOAD` set to one of `1`, `true`, `yes`, `on`.
pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

pub fn emit_debug_payload<T: Serialize>(request_url: &str, payload: &T) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    debug!(url = request_url, payload = %formatted_payload, "agent request payload");
}

pub fn emit_frame_decode_error(frame: &str, reason: &str) {
    warn!(reason, frame = %truncate_frame(frame), "dropped undecodable stream frame");
}

fn truncate_frame(frame: &str) -> String {
    if frame.chars().count() <= MAX_LOGGED_FRAME_CHARS {
        return frame.to_string();
    }
    let mut truncated: String = frame.chars().take(MAX_LOGGED_FRAME_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_payload_enabled_accepts_true_variants() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(DEBUG_PAYLOAD_ENV, "1");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "TRUE");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, " on ");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "nope");
        assert!(!debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "off");
        assert!(!debug_payload_enabled());
        std::env::remove_var(DEBUG_PAYLOAD_ENV);
        assert!(!debug_payload_enabled());
    }

    #[test]
    fn test_long_frames_are_truncated_for_logging() {
        let frame = "x".repeat(500);
        let logged = truncate_frame(&frame);
        assert_eq!(logged.len(), MAX_LOGGED_FRAME_CHARS + 3);
        assert!(logged.ends_with("..."));
        assert_eq!(truncate_frame("short"), "short");
    }
}
