use chrono::{DateTime, Utc};

/// Capacity snapshot parsed from the service's status report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiStatus {
    /// Connection identifier. A report without one is not a valid snapshot.
    pub client_id: Option<String>,
    /// Server clock at report time.
    pub current_time: Option<DateTime<Utc>>,
    /// Slots granted to this client; `0` means unlimited.
    pub rate_limit: u32,
    /// Tab-separated fields of each query currently running for this client.
    pub slots_running: Vec<Vec<String>>,
    /// Seconds until each saturated slot frees up.
    pub slots_available_after: Vec<i64>,
}

/// Delimited table returned by `[out:csv(...)]` queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Decodes delimited text whose first non-empty line is the header.
    pub fn parse(text: &str, separator: char) -> Self {
        crate::decode::decode_csv(text, separator)
    }
}
