/// Public instance used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Client-wide defaults for every query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Interpreter URL the query is posted to.
    pub endpoint: String,
    /// Number of retries after the initial attempt for 429 and 504 responses.
    pub num_retries: u32,
    /// Pause in milliseconds before retrying a gateway timeout.
    pub retry_pause_ms: u64,
    /// Emits diagnostic events through `tracing` when enabled.
    pub verbose: bool,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            num_retries: 1,
            retry_pause_ms: 2_000,
            verbose: false,
            user_agent: concat!("overpass-http/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl ClientOptions {
    /// Builds options from environment variables on top of the defaults.
    ///
    /// Reads (all optional):
    /// - `OVERPASS_ENDPOINT`
    /// - `OVERPASS_NUM_RETRIES`
    /// - `OVERPASS_RETRY_PAUSE_MS`
    /// - `OVERPASS_VERBOSE` (`true`/`false`/`1`/`0`)
    /// - `OVERPASS_USER_AGENT`
    ///
    /// A variable that is set but empty or unparseable is an error.
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(endpoint) = non_empty(&lookup, "OVERPASS_ENDPOINT")? {
            options.endpoint = endpoint;
        }
        if let Some(retries) = non_empty(&lookup, "OVERPASS_NUM_RETRIES")? {
            options.num_retries = retries
                .parse()
                .map_err(|err| format!("invalid OVERPASS_NUM_RETRIES '{retries}': {err}"))?;
        }
        if let Some(pause) = non_empty(&lookup, "OVERPASS_RETRY_PAUSE_MS")? {
            options.retry_pause_ms = pause
                .parse()
                .map_err(|err| format!("invalid OVERPASS_RETRY_PAUSE_MS '{pause}': {err}"))?;
        }
        if let Some(verbose) = non_empty(&lookup, "OVERPASS_VERBOSE")? {
            options.verbose = match verbose.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(format!("invalid OVERPASS_VERBOSE '{verbose}'")),
            };
        }
        if let Some(user_agent) = non_empty(&lookup, "OVERPASS_USER_AGENT")? {
            options.user_agent = user_agent;
        }

        Ok(options)
    }

    /// Overlays per-call overrides onto these defaults.
    pub fn resolve(&self, overrides: &RequestOverrides) -> RequestConfig {
        RequestConfig {
            endpoint: overrides
                .endpoint
                .clone()
                .unwrap_or_else(|| self.endpoint.clone()),
            retries_remaining: overrides.num_retries.unwrap_or(self.num_retries),
            retry_pause_ms: overrides.retry_pause_ms.unwrap_or(self.retry_pause_ms),
            verbose: overrides.verbose.unwrap_or(self.verbose),
            user_agent: overrides
                .user_agent
                .clone()
                .unwrap_or_else(|| self.user_agent.clone()),
        }
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> std::result::Result<Option<String>, String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(format!("{name} is set but empty")),
        Some(value) => Ok(Some(value.trim().to_owned())),
    }
}

/// Per-call overrides. `None` keeps the client default.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestOverrides {
    pub endpoint: Option<String>,
    pub num_retries: Option<u32>,
    pub retry_pause_ms: Option<u64>,
    pub verbose: Option<bool>,
    pub user_agent: Option<String>,
}

impl RequestOverrides {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn num_retries(mut self, num_retries: u32) -> Self {
        self.num_retries = Some(num_retries);
        self
    }

    pub fn retry_pause_ms(mut self, retry_pause_ms: u64) -> Self {
        self.retry_pause_ms = Some(retry_pause_ms);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Settings for one top-level call, threaded through its retries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestConfig {
    pub endpoint: String,
    /// Retries left for this call. Only ever decreases.
    pub retries_remaining: u32,
    pub retry_pause_ms: u64,
    pub verbose: bool,
    pub user_agent: String,
}

impl RequestConfig {
    /// Returns a copy with one retry consumed, or `None` when the budget is spent.
    pub fn consume_retry(&self) -> Option<Self> {
        let retries_remaining = self.retries_remaining.checked_sub(1)?;
        Some(Self {
            retries_remaining,
            ..self.clone()
        })
    }
}
