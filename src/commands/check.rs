//! Check command implementation

use crate::config::{Config, ResponseFormat, Settings, API_KEY_VAR, USER_EMAIL_VAR};
use crate::error::{Error, Result};
use crate::kb::{KnowledgeBase, QueryClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Effective configuration, safe to display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInfo {
    pub endpoint: String,
    pub api_key: String,
    pub user_email: String,
    pub timeout_secs: u64,
    pub auth_error_hints: bool,
    pub response_format: ResponseFormat,
}

/// Validate options and credentials without contacting the API
pub fn cmd_check(config: &Config, settings: Arc<Settings>) -> Result<CheckInfo> {
    info!("Checking configuration");
    config.validate()?;

    let client = QueryClient::new(Arc::clone(&settings), &config.api)?;
    info!("Configuration valid for {}", client.describe());

    Ok(CheckInfo {
        endpoint: client.endpoint().to_string(),
        api_key: settings.masked_api_key(),
        user_email: settings.user_email().to_string(),
        timeout_secs: config.api.timeout_secs,
        auth_error_hints: config.api.auth_error_hints,
        response_format: config.response.format,
    })
}

/// Print check results to console
pub fn print_check(info: &CheckInfo) {
    println!("✓ Configuration is valid\n");
    println!("  Endpoint:     {}", info.endpoint);
    println!("  API key:      {}", info.api_key);
    println!("  User email:   {}", info.user_email);
    println!("  Timeout:      {}s", info.timeout_secs);
    println!("  Auth hints:   {}", info.auth_error_hints);
    println!("  Format:       {:?}", info.response_format);
}

/// Explain how to fix missing or invalid credentials
pub fn print_settings_help(err: &Error) {
    eprintln!("\nError: Missing required configuration\n");

    if let Error::Settings { problems } = err {
        eprintln!("Problems with environment variables:");
        for problem in problems {
            eprintln!("  - {}", problem);
        }
    } else {
        eprintln!("{}", err);
    }

    eprintln!("\nPlease configure the ICAET MCP server in your editor:");
    eprintln!("1. Open the editor's MCP settings");
    eprintln!("2. Find the icaet server entry");
    eprintln!(
        "3. Add {} and {} environment variables\n",
        API_KEY_VAR, USER_EMAIL_VAR
    );
}
