//! Default values for configuration

use super::ResponseFormat;

/// Default ICAET API base URL, overridable with `ICAET_BASE_URL`
pub fn default_base_url() -> String {
    std::env::var("ICAET_BASE_URL")
        .unwrap_or_else(|_| "https://icaet-dev.wesleyreisz.com".to_string())
}

/// Default request timeout in seconds
pub fn default_timeout_secs() -> u64 {
    30
}

/// Default: give 401/400 responses dedicated messages
pub fn default_auth_error_hints() -> bool {
    true
}

/// Default: unwrap the `answer` field of successful responses
pub fn default_response_format() -> ResponseFormat {
    ResponseFormat::Answer
}

/// Upper bound accepted for `api.timeout_secs`
pub const MAX_TIMEOUT_SECS: u64 = 300;
