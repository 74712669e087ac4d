use serde::{Deserialize, Serialize};

/// Form body of an interpreter request: `data=<url-encoded query>`.
#[derive(Debug, Serialize)]
pub struct QueryForm<'a> {
    pub data: &'a str,
}

/// Top-level members of a JSON response inspected before handing it out.
#[derive(Debug, Deserialize)]
pub struct RemarkEnvelope {
    #[serde(default)]
    pub remark: Option<serde_json::Value>,
}
