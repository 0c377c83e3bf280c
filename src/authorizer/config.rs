use serde::Deserialize;

use crate::errors::{Error, Result};

/// Options recognized when building an `Authorizer`.
///
/// ```json
/// { "deniedStatusCode": 403, "inMemory": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizerConfig {
    /// Status signaled on denial when a gate has no deny handler.
    pub denied_status_code: u16,
    /// Whether the `in-memory` back-end is registered.
    pub in_memory: bool,
}

impl AuthorizerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Deserializing)
    }
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            denied_status_code: 405,
            in_memory: true,
        }
    }
}
