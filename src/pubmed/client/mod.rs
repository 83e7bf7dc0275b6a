mod history;

pub use history::{MAX_BATCH_SIZE, ResultPaginator};

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{PubMedError, Result};
use crate::pubmed::models::{SearchOptions, SearchSession};
use crate::pubmed::responses::ESearchResult;
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;

/// ESearch parameters set by the client itself; callers cannot override them
const RESERVED_SEARCH_PARAMS: &[&str] = &["db", "retmode", "usehistory", "term", "retmax"];

/// Client for the PubMed E-utilities
#[derive(Clone)]
pub struct PubMedClient {
    client: Client,
    pub(crate) base_url: String,
    rate_limiter: RateLimiter,
    config: ClientConfig,
}

impl PubMedClient {
    /// Create a client with default configuration
    ///
    /// Uses NCBI's anonymous rate limit (3 requests/second) and no API key.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new())
    }

    /// Create a client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_ingest::{ClientConfig, PubMedClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_email("researcher@university.edu")
    ///     .with_tool("my-harvester");
    ///
    /// let client = PubMedClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let rate_limiter = config.create_rate_limiter();
        let base_url = config.effective_base_url().to_string();

        let client = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to configure HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            base_url,
            rate_limiter,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a search on the history server.
    ///
    /// The returned session addresses the full result set; paginate it with
    /// [`paginate`](Self::paginate) or stream it with
    /// [`citations`](Self::citations). `options.retmax` caps how many records
    /// pagination will fetch and is also sent to ESearch, bounding the inline
    /// PMID list.
    ///
    /// # Errors
    ///
    /// * `PubMedError::MalformedResponse` - `Count`, `WebEnv` or `QueryKey` is missing
    /// * `PubMedError::ApiError` - non-success status, or ESearch reported an error
    /// * `PubMedError::XmlError` - the response is not ESearch XML
    /// * `PubMedError::RequestError` - the request failed after all retries
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_ingest::{PubMedClient, SearchOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new();
    ///     let options = SearchOptions::new().with_retmax(1000).with_param("sort", "pub_date");
    ///     let session = client.search("asthma[mh]", &options).await?;
    ///     println!("{} hits, fetching {}", session.total_count, session.records_to_fetch());
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self, options), fields(query = %query))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchSession> {
        let mut url = format!(
            "{}/esearch.fcgi?db=pubmed&retmode=xml&usehistory=y&term={}",
            self.base_url,
            urlencoding::encode(query)
        );

        if let Some(retmax) = options.retmax {
            url.push_str(&format!("&retmax={}", retmax));
        }

        for (key, value) in &options.params {
            if RESERVED_SEARCH_PARAMS.contains(&key.as_str()) {
                debug!(param = %key, "Ignoring reserved search parameter");
                continue;
            }
            url.push_str(&format!(
                "&{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            ));
        }

        let body = self.get_text(&url, "ESearch request").await?;
        let mut result = ESearchResult::from_xml(&body)?;

        if let Some(error_msg) = &result.error {
            return Err(PubMedError::ApiError {
                status: 200,
                message: format!("NCBI ESearch API error: {}", error_msg.trim()),
            });
        }

        let total_count = required_field(result.count.as_deref(), "Count")?
            .parse::<usize>()
            .map_err(|e| PubMedError::MalformedResponse {
                message: format!("ESearch Count is not a number: {}", e),
            })?;
        let webenv = required_field(result.webenv.as_deref(), "WebEnv")?.to_string();
        let query_key = required_field(result.query_key.as_deref(), "QueryKey")?.to_string();
        let pmids = result.pmids();

        info!(
            total_count,
            returned_count = pmids.len(),
            query_translation = ?result.query_translation,
            "Search with history completed"
        );

        Ok(SearchSession {
            query: query.to_string(),
            webenv,
            query_key,
            total_count,
            retmax: options.retmax,
            pmids,
        })
    }

    /// GET `url` with identification parameters appended and return the body.
    ///
    /// Each attempt takes a rate-limiter token. Transport failures, 5xx and
    /// 429 are retried per the configured [`RetryConfig`](crate::RetryConfig);
    /// reading the body is part of the attempt, so a truncated body is retried
    /// too.
    pub(crate) async fn get_text(&self, url: &str, context: &str) -> Result<String> {
        let final_url = self.with_api_params(url);

        with_retry(
            || async {
                self.rate_limiter.acquire().await?;
                debug!("Making API request to: {}", final_url);
                let response = self.client.get(&final_url).send().await?;

                let status = response.status();
                if !status.is_success() {
                    if status.is_client_error() && status.as_u16() != 429 {
                        warn!("API request failed with status: {}", status);
                    }
                    return Err(PubMedError::ApiError {
                        status: status.as_u16(),
                        message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
                    });
                }

                Ok(response.text().await?)
            },
            &self.config.retry_config,
            context,
        )
        .await
    }

    fn with_api_params(&self, url: &str) -> String {
        let mut final_url = url.to_string();
        let api_params = self.config.build_api_params();

        if !api_params.is_empty() {
            let separator = if url.contains('?') { '&' } else { '?' };
            final_url.push(separator);

            let param_strings: Vec<String> = api_params
                .into_iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
                .collect();
            final_url.push_str(&param_strings.join("&"));
        }

        final_url
    }
}

impl Default for PubMedClient {
    fn default() -> Self {
        Self::new()
    }
}

fn required_field<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PubMedError::MalformedResponse {
            message: format!("ESearch response is missing {}", name),
        })
}
