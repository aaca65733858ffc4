//! Resolver configuration.

use crate::{ResolverError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

pub const TAXALINK_SPARQL_ENDPOINT_ENV: &str = "TAXALINK_SPARQL_ENDPOINT";
pub const TAXALINK_SPARQL_TIMEOUT_SECS_ENV: &str = "TAXALINK_SPARQL_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout.
    pub read_timeout_secs: u64,
    pub user_agent: String,
    /// Language tag substituted for `{{LANG}}`.
    pub preferred_language: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            user_agent: concat!("taxalink/", env!("CARGO_PKG_VERSION")).to_string(),
            preferred_language: "en".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by `TAXALINK_SPARQL_ENDPOINT` and
    /// `TAXALINK_SPARQL_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(endpoint) = var(TAXALINK_SPARQL_ENDPOINT_ENV) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                self.endpoint = endpoint.to_string();
            }
        }
        if let Some(secs) = var(TAXALINK_SPARQL_TIMEOUT_SECS_ENV) {
            let secs = secs.trim();
            if !secs.is_empty() {
                self.read_timeout_secs = secs.parse().map_err(|_| ResolverError::Config {
                    name: TAXALINK_SPARQL_TIMEOUT_SECS_ENV,
                    value: secs.to_string(),
                })?;
            }
        }
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
