//! `overpass-http` is an async HTTP client for the Overpass API.
//!
//! Queries are opaque strings posted to an interpreter endpoint. Rate
//! limiting (429) and gateway timeouts (504) are retried transparently,
//! consulting the instance's `/api/status` report to decide how long to
//! wait. Results are available as:
//! - [`OverpassClient::query`] (raw response)
//! - [`OverpassClient::query_json`]
//! - [`OverpassClient::query_xml`]
//! - [`OverpassClient::query_csv`]
//! - [`OverpassClient::query_stream`]

pub mod backoff;
mod client;
mod decode;
mod error;
mod options;
mod status;
mod types;
pub mod util;
mod wire;

pub use client::OverpassClient;
pub use error::OverpassError;
pub use options::{ClientOptions, RequestConfig, RequestOverrides, DEFAULT_ENDPOINT};
pub use status::parse_status;
pub use types::{ApiStatus, CsvTable};

pub type Result<T> = std::result::Result<T, OverpassError>;

