use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::action_executor::{self, LaunchError};
use crate::contract::{ActivateRequest, HostRequest, PluginResponse, ResultsResponse};
use crate::model::ResultItem;
use crate::presenter::Platform;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    UnknownItem,
    UnknownAction,
    Launch,
    Plugin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: PluginResponse },
    Err { error: ErrorResponse },
}

impl TransportResponse {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Err {
            error: ErrorResponse {
                code,
                message: message.into(),
            },
        }
    }

    pub fn results(invocation: u64, plugin: &str, items: Vec<ResultItem>) -> Self {
        Self::Ok {
            response: PluginResponse::Results(ResultsResponse {
                invocation,
                plugin: plugin.to_string(),
                items,
            }),
        }
    }
}

pub fn parse_request(line: &str) -> Result<HostRequest, TransportResponse> {
    serde_json::from_str::<HostRequest>(line)
        .map_err(|error| TransportResponse::error(ErrorCode::InvalidJson, error.to_string()))
}

/// One JSON line, without the trailing newline.
pub fn encode(response: &TransportResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        format!(
            "{{\"status\":\"err\",\"error\":{{\"code\":\"plugin\",\"message\":{:?}}}}}",
            error.to_string()
        )
    })
}

/// Items from the latest published results, addressable by id for activation.
#[derive(Debug, Default)]
pub struct ActivationTable {
    items: HashMap<String, ResultItem>,
}

impl ActivationTable {
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn extend(&mut self, items: &[ResultItem]) {
        for item in items {
            self.items.insert(item.id.clone(), item.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn activate(&self, request: ActivateRequest, platform: Platform) -> TransportResponse {
        self.activate_with(request, |effect| action_executor::execute(effect, platform))
    }

    /// Resolve the requested action and hand its effect to `run`.
    pub fn activate_with<F>(&self, request: ActivateRequest, run: F) -> TransportResponse
    where
        F: FnOnce(&crate::model::ActionEffect) -> Result<(), LaunchError>,
    {
        let Some(item) = self.items.get(&request.item_id) else {
            return TransportResponse::error(
                ErrorCode::UnknownItem,
                format!("item not found: {}", request.item_id),
            );
        };
        let Some(action) = item.actions.get(request.action) else {
            return TransportResponse::error(
                ErrorCode::UnknownAction,
                format!(
                    "action {} out of range for '{}' ({} actions)",
                    request.action,
                    request.item_id,
                    item.actions.len()
                ),
            );
        };

        match run(&action.effect) {
            Ok(()) => TransportResponse::Ok {
                response: PluginResponse::Activated(request),
            },
            Err(error) => {
                tracing::warn!(item = %request.item_id, %error, "action failed");
                TransportResponse::error(ErrorCode::Launch, error.to_string())
            }
        }
    }
}
