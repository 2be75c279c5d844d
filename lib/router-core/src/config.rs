//! Engine configuration

use crate::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Options for the router whose routes are reconciled
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RouterOpts {
    /// ID of the router carrying the routes
    #[serde(
        default,
        rename = "router-id",
        alias = "router_id",
        deserialize_with = "trimmed"
    )]
    pub router_id: String,
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

impl RouterOpts {
    pub fn new(router_id: impl Into<String>) -> Self {
        Self {
            router_id: router_id.into().trim().to_string(),
        }
    }

    /// Fail fast on options the reconciler cannot run without.
    /// The router ID must be non-empty and carry no surrounding whitespace.
    pub fn validate(&self) -> Result<()> {
        let id = self.router_id.trim();
        if id.is_empty() || id != self.router_id {
            return Err(CoreError::ConfigurationMissing("router-id".to_string()));
        }
        Ok(())
    }
}
