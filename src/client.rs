use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    backoff::{self, Backoff},
    decode::{
        check_xml_remark, decode_csv, decode_json, decode_utf8, extract_bad_request_messages,
    },
    status::{parse_status, status_url},
    wire::QueryForm,
    ApiStatus, ClientOptions, CsvTable, OverpassError, RequestConfig, RequestOverrides, Result,
};

/// Emits an `info` event when the request has verbose diagnostics enabled.
macro_rules! verbose {
    ($config:expr, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            if $config.verbose {
                tracing::info!($($arg)+);
            }
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = &$config;
        }
    }};
}

#[derive(Clone, Debug)]
/// HTTP client for an Overpass API instance.
pub struct OverpassClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OverpassClient {
    /// Creates a client for the default public instance.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client for a specific interpreter URL.
    ///
    /// Example: `"https://overpass.kumi.systems/api/interpreter"`
    pub fn from_endpoint(endpoint: impl Into<String>) -> Self {
        let options = ClientOptions {
            endpoint: endpoint.into(),
            ..ClientOptions::default()
        };
        Self::new().with_options(options)
    }

    /// Creates a client configured from `OVERPASS_*` environment variables.
    ///
    /// See [`ClientOptions::from_env`] for the variables read.
    pub fn from_env() -> std::result::Result<Self, String> {
        Ok(Self::new().with_options(ClientOptions::from_env()?))
    }

    /// Replaces the client-wide defaults.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Uses a preconfigured `reqwest` client, e.g. with custom TLS or proxies.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Runs a query and returns the raw successful response.
    pub async fn query(&self, query: &str) -> Result<reqwest::Response> {
        self.query_with(query, &RequestOverrides::default()).await
    }

    pub async fn query_with(
        &self,
        query: &str,
        overrides: &RequestOverrides,
    ) -> Result<reqwest::Response> {
        self.execute(query, self.options.resolve(overrides)).await
    }

    /// Runs a query with `[out:json]` output and returns the document.
    ///
    /// A top-level `remark` string is reported as [`OverpassError::Remark`].
    pub async fn query_json(&self, query: &str) -> Result<serde_json::Value> {
        self.query_json_with(query, &RequestOverrides::default())
            .await
    }

    pub async fn query_json_with(
        &self,
        query: &str,
        overrides: &RequestOverrides,
    ) -> Result<serde_json::Value> {
        let body = self.query_text(query, overrides).await?;
        decode_json(&body)
    }

    /// Like [`OverpassClient::query_json`], deserialized into `T`.
    pub async fn query_json_as<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        self.query_json_as_with(query, &RequestOverrides::default())
            .await
    }

    pub async fn query_json_as_with<T: DeserializeOwned>(
        &self,
        query: &str,
        overrides: &RequestOverrides,
    ) -> Result<T> {
        let value = self.query_json_with(query, overrides).await?;
        serde_json::from_value(value)
            .map_err(|err| OverpassError::Decode(format!("unexpected JSON shape: {err}")))
    }

    /// Runs a query with XML output and returns the markup.
    ///
    /// A `<remark>` element is reported as [`OverpassError::Remark`].
    pub async fn query_xml(&self, query: &str) -> Result<String> {
        self.query_xml_with(query, &RequestOverrides::default())
            .await
    }

    pub async fn query_xml_with(&self, query: &str, overrides: &RequestOverrides) -> Result<String> {
        let body = self.query_text(query, overrides).await?;
        check_xml_remark(&body)?;
        Ok(body)
    }

    /// Runs an `[out:csv(...)]` query using the default tab separator.
    pub async fn query_csv(&self, query: &str) -> Result<CsvTable> {
        self.query_csv_with(query, &RequestOverrides::default())
            .await
    }

    pub async fn query_csv_with(
        &self,
        query: &str,
        overrides: &RequestOverrides,
    ) -> Result<CsvTable> {
        let body = self.query_text(query, overrides).await?;
        Ok(decode_csv(&body, '\t'))
    }

    /// Runs a query and streams the response body as it arrives.
    pub async fn query_stream(
        &self,
        query: &str,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        self.query_stream_with(query, &RequestOverrides::default())
            .await
    }

    pub async fn query_stream_with(
        &self,
        query: &str,
        overrides: &RequestOverrides,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let response = self.query_with(query, overrides).await?;
        Ok(response.bytes_stream().map_err(OverpassError::Transport))
    }

    /// Fetches the capacity report for this client's connection.
    pub async fn api_status(&self) -> Result<ApiStatus> {
        self.api_status_with(&RequestOverrides::default()).await
    }

    pub async fn api_status_with(&self, overrides: &RequestOverrides) -> Result<ApiStatus> {
        self.fetch_status(&self.options.resolve(overrides)).await
    }

    /// Sends `query` and resolves rate limiting and gateway timeouts.
    ///
    /// Returns the response untouched on 2xx. 429 and 504 are retried
    /// while `config.retries_remaining` lasts, each retry running on a copy
    /// of the config with one retry consumed. Every other status fails
    /// without retrying.
    pub async fn execute(&self, query: &str, config: RequestConfig) -> Result<reqwest::Response> {
        let mut config = config;
        loop {
            verbose!(
                config,
                endpoint = %config.endpoint,
                query,
                retries_remaining = config.retries_remaining,
                "sending overpass query"
            );

            let response = self
                .http
                .post(&config.endpoint)
                .header(header::ACCEPT, "*")
                .header(header::USER_AGENT, &config.user_agent)
                .form(&QueryForm { data: query })
                .send()
                .await
                .map_err(OverpassError::Transport)?;

            let status = response.status();
            if status.is_success() {
                verbose!(
                    config,
                    status = status.as_u16(),
                    "overpass query succeeded"
                );
                return Ok(response);
            }

            match status {
                StatusCode::BAD_REQUEST => {
                    let body = response.text().await.map_err(OverpassError::Transport)?;
                    return Err(OverpassError::BadRequest {
                        query: query.to_owned(),
                        messages: extract_bad_request_messages(&body),
                    });
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let Some(next) = config.consume_retry() else {
                        return Err(OverpassError::RateLimited);
                    };
                    let snapshot = self.fetch_status(&config).await?;
                    if let Backoff::Wait(delay) = backoff::decide(&snapshot) {
                        verbose!(
                            config,
                            wait_secs = delay.as_secs(),
                            "rate limited, waiting for a free slot"
                        );
                        sleep(delay).await;
                    }
                    config = next;
                }
                StatusCode::GATEWAY_TIMEOUT => {
                    let Some(next) = config.consume_retry() else {
                        return Err(OverpassError::GatewayTimeout);
                    };
                    verbose!(
                        config,
                        pause_ms = config.retry_pause_ms,
                        "gateway timeout, pausing before retry"
                    );
                    sleep(Duration::from_millis(config.retry_pause_ms)).await;
                    config = next;
                }
                other => {
                    return Err(OverpassError::Http {
                        status: other.as_u16(),
                        reason: other.canonical_reason().unwrap_or("Unknown").to_owned(),
                    });
                }
            }
        }
    }

    /// Reads a successful body as strict UTF-8.
    ///
    /// The size is logged from the decoded body since `Content-Length` is
    /// dropped for compressed responses.
    async fn query_text(&self, query: &str, overrides: &RequestOverrides) -> Result<String> {
        let config = self.options.resolve(overrides);
        let response = self.execute(query, config.clone()).await?;
        let body = response.bytes().await.map_err(OverpassError::Transport)?;
        verbose!(
            config,
            size = %crate::util::format_bytes(body.len() as u64),
            "overpass response received"
        );
        decode_utf8(&body)
    }

    async fn fetch_status(&self, config: &RequestConfig) -> Result<ApiStatus> {
        let url = status_url(&config.endpoint)?;
        let response = self
            .http
            .get(url)
            .header(header::USER_AGENT, &config.user_agent)
            .send()
            .await
            .map_err(OverpassError::Transport)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type);
        if content_type.as_deref() != Some("text/plain") {
            return Err(OverpassError::ApiStatus(format!(
                "expected text/plain status report, got {} (HTTP {})",
                content_type.as_deref().unwrap_or("no content type"),
                response.status().as_u16()
            )));
        }

        let text = response.text().await.map_err(OverpassError::Transport)?;
        let snapshot = parse_status(&text);
        if snapshot.client_id.is_none() {
            return Err(OverpassError::ApiStatus(
                "status report has no client id".to_owned(),
            ));
        }
        Ok(snapshot)
    }
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
