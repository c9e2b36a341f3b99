//! Environment-driven configuration.

/// Application-level constants
pub const APP_NAME: &str = "Veridoc";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fallback backend base URL for local development.
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Default per-request HTTP timeout (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Base URL of the KYC portal backend.
/// Override with `VERIDOC_API_URL`.
pub fn api_base_url() -> String {
    std::env::var("VERIDOC_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
}

/// Per-request HTTP timeout in seconds.
/// Override with `VERIDOC_REQUEST_TIMEOUT_SECS`.
pub fn request_timeout_secs() -> u64 {
    std::env::var("VERIDOC_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}
