//! Client configuration
//!
//! Endpoint, contact identity and politeness settings are passed explicitly to
//! [`PubMedClient::with_config`](crate::PubMedClient::with_config); nothing is
//! held in process-wide state.

use std::env;
use std::time::Duration;

use crate::rate_limit::RateLimiter;
use crate::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_TOOL: &str = "pubmed-ingest";

/// Configuration for [`PubMedClient`](crate::PubMedClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// NCBI API key, raises the rate limit to 10 requests/second
    pub api_key: Option<String>,
    /// Contact address NCBI uses to reach the operator of a misbehaving tool
    pub email: Option<String>,
    /// Tool identifier sent with every request
    pub tool: Option<String>,
    /// Override for the E-utilities endpoint (tests, mirrors)
    pub base_url: Option<String>,
    /// Requests per second; defaults depend on whether an API key is set
    pub rate_limit: Option<f64>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            email: None,
            tool: None,
            base_url: None,
            rate_limit: None,
            timeout: Duration::from_secs(30),
            user_agent: None,
            retry_config: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus `NCBI_API_KEY` and `NCBI_EMAIL` from the environment, when set
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(api_key) = env::var("NCBI_API_KEY") {
            if !api_key.trim().is_empty() {
                config = config.with_api_key(api_key.trim());
            }
        }
        if let Ok(email) = env::var("NCBI_EMAIL") {
            if !email.trim().is_empty() {
                config = config.with_email(email.trim());
            }
        }
        config
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tool = Some(tool.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: f64) -> Self {
        self.rate_limit = Some(requests_per_second);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_seconds(self, seconds: u64) -> Self {
        self.with_timeout(Duration::from_secs(seconds))
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn effective_rate_limit(&self) -> f64 {
        match (self.rate_limit, &self.api_key) {
            (Some(rate), _) => rate,
            (None, Some(_)) => 10.0,
            (None, None) => 3.0,
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn effective_tool(&self) -> &str {
        self.tool.as_deref().unwrap_or(DEFAULT_TOOL)
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
    }

    pub fn create_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.effective_rate_limit())
    }

    /// Identification parameters appended to every E-utilities request
    pub fn build_api_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(api_key) = &self.api_key {
            params.push(("api_key".to_string(), api_key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        params.push(("tool".to_string(), self.effective_tool().to_string()));
        params
    }
}
