/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum OverpassError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The service rejected the query as malformed (HTTP 400).
    ///
    /// Never retried: resubmitting the same query cannot succeed.
    #[error("bad request: {}", messages.join("; "))]
    BadRequest {
        /// Query text as submitted.
        query: String,
        /// Error messages extracted from the service's HTML error page.
        messages: Vec<String>,
    },
    /// HTTP 429 with no retry budget left.
    #[error("rate limited: no retries remaining")]
    RateLimited,
    /// HTTP 504 with no retry budget left.
    #[error("gateway timeout: no retries remaining")]
    GatewayTimeout,
    /// The status endpoint returned something that is not a capacity report.
    #[error("api status error: {0}")]
    ApiStatus(String),
    /// Any other non-success HTTP status.
    #[error("http error {status}: {reason}")]
    Http { status: u16, reason: String },
    /// The service answered with success but reported a runtime failure
    /// in a `remark` member of the body.
    #[error("runtime remark: {0}")]
    Remark(String),
    /// Response body could not be decoded into the requested format.
    #[error("decode error: {0}")]
    Decode(String),
}
