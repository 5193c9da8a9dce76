//! Custom error types for icaet-mcp

use crate::config::{SettingsProblem, API_KEY_VAR, USER_EMAIL_VAR};
use thiserror::Error;

/// Message shown for every transport failure that produced no HTTP response
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";

/// Message shown when the upstream does not answer within the timeout budget
pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. The ICAET API is taking too long to respond. Please try again.";

/// Body substituted when a failing upstream response has no text
pub const UNKNOWN_UPSTREAM_BODY: &str = "Unknown error";

/// Main error type for icaet-mcp operations
#[derive(Error, Debug)]
pub enum Error {
    /// Required credentials are missing or malformed
    #[error("Invalid configuration: {}", join_problems(.problems))]
    Settings { problems: Vec<SettingsProblem> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Transport failure before any HTTP response; `detail` is for logs only
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network { detail: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("MCP protocol error: {0}")]
    McpProtocol(String),
}

fn join_problems(problems: &[SettingsProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// True when the upstream rejected the API key
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Upstream { status: 401, .. })
    }

    /// Render the error for the person at the other end of the tool call.
    ///
    /// With `auth_hints` enabled, 401 and 400 responses get dedicated
    /// guidance; otherwise every upstream failure reads `HTTP {status}: {body}`.
    pub fn user_message(&self, auth_hints: bool) -> String {
        match self {
            Error::Settings { problems } => {
                let details = join_problems(problems);
                format!(
                    "Missing configuration. Please set {} and {} environment variables in your MCP settings. ({})",
                    API_KEY_VAR, USER_EMAIL_VAR, details
                )
            }
            Error::InvalidInput(msg) => msg.clone(),
            Error::Upstream { status: 401, .. } if auth_hints => {
                format!("Authentication failed. Please check your {}.", API_KEY_VAR)
            }
            Error::Upstream { status: 400, .. } if auth_hints => {
                "Invalid request. Please check your question format and email.".to_string()
            }
            Error::Upstream { status, body } => {
                format!("API error: HTTP {}: {}", status, body)
            }
            Error::Timeout | Error::Network { .. } => self.to_string(),
            Error::Unexpected(msg) => {
                format!("An unexpected error occurred: {}. Please try again.", msg)
            }
            other => format!("An unexpected error occurred: {}. Please try again.", other),
        }
    }
}

/// Result type alias for icaet-mcp
pub type Result<T> = std::result::Result<T, Error>;
