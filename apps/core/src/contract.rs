use serde::{Deserialize, Serialize};

use crate::model::ResultItem;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivateRequest {
    pub item_id: String,
    pub action: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum HostRequest {
    Search(SearchRequest),
    /// The in-flight query is no longer current.
    Interrupt,
    Activate(ActivateRequest),
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultsResponse {
    pub invocation: u64,
    pub plugin: String,
    pub items: Vec<ResultItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum PluginResponse {
    Results(ResultsResponse),
    Activated(ActivateRequest),
}
