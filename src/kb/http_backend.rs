use super::{KnowledgeBase, QueryResponse};
use crate::config::{ApiConfig, Settings, API_KEY_VAR};
use crate::error::{Error, Result, UNKNOWN_UPSTREAM_BODY};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Serialize)]
struct QueryRequest<'a> {
    email: &'a str,
    question: &'a str,
}

/// Client for the ICAET `/query` endpoint
pub struct QueryClient {
    client: Client,
    endpoint: Url,
    settings: Arc<Settings>,
    timeout: Duration,
}

impl QueryClient {
    pub fn new(settings: Arc<Settings>, config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let endpoint = query_endpoint(&base_url)?;
        let timeout = config.timeout();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            settings,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut api_key = HeaderValue::from_str(self.settings.api_key()).map_err(|_| {
            Error::Config(format!(
                "{} contains characters that are not allowed in an HTTP header",
                API_KEY_VAR
            ))
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, api_key);
        Ok(headers)
    }

    /// Send one question to the knowledge base.
    ///
    /// Blank questions fail with [`Error::InvalidInput`] before any request
    /// is made. There are no retries.
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput(
                "Question cannot be empty. Please provide a valid question.".to_string(),
            ));
        }

        let payload = QueryRequest {
            email: self.settings.user_email(),
            question,
        };

        info!(
            endpoint = %self.endpoint,
            api_key = %self.settings.masked_api_key(),
            "Querying ICAET knowledge base"
        );
        debug!("Question: {}", question);

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "Failed to read ICAET error body");
                    String::new()
                }
            };
            let body = if body.trim().is_empty() {
                UNKNOWN_UPSTREAM_BODY.to_string()
            } else {
                body
            };
            warn!(status = status.as_u16(), "ICAET API returned an error status");
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let body: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Unexpected(format!("ICAET API returned an invalid JSON object: {}", e))
        })?;

        debug!("Received response with {} fields", body.len());
        Ok(QueryResponse::new(body))
    }

    /// Sort a transport failure into timeout, network, or unexpected
    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            warn!(timeout_secs = self.timeout.as_secs(), "ICAET request timed out");
            Error::Timeout
        } else if err.is_connect() || err.is_request() {
            warn!(error = %err, "ICAET request failed before a response");
            Error::Network {
                detail: err.to_string(),
            }
        } else {
            warn!(error = %err, "ICAET request failed");
            Error::Unexpected(err.to_string())
        }
    }
}

/// Append the `query` segment to the base path, keeping any prefix
fn query_endpoint(base_url: &Url) -> Result<Url> {
    let mut endpoint = base_url.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| Error::Config(format!("ICAET base URL cannot take a path: {}", base_url)))?
        .pop_if_empty()
        .push("query");
    Ok(endpoint)
}

#[async_trait]
impl KnowledgeBase for QueryClient {
    async fn ask(&self, question: &str) -> Result<QueryResponse> {
        self.query(question).await
    }

    fn describe(&self) -> String {
        format!("ICAET API at {}", self.endpoint)
    }
}
