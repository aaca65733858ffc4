//! SPARQL query execution.

use crate::{ResolverConfig, ResolverError, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::sync::Arc;
use url::Url;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Executes a SPARQL query and returns the raw JSON response body.
pub trait SparqlEndpoint: Send + Sync {
    fn execute(&self, sparql: &str) -> Result<String>;
}

impl<T: SparqlEndpoint + ?Sized> SparqlEndpoint for Arc<T> {
    fn execute(&self, sparql: &str) -> Result<String> {
        (**self).execute(sparql)
    }
}

impl<T: SparqlEndpoint + ?Sized> SparqlEndpoint for &T {
    fn execute(&self, sparql: &str) -> Result<String> {
        (**self).execute(sparql)
    }
}

/// Blocking HTTPS GET against a public endpoint. Calls fail fast: connect and
/// request timeouts are enforced and nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpSparqlEndpoint {
    client: Client,
    endpoint: Url,
}

impl HttpSparqlEndpoint {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|_| ResolverError::InvalidEndpoint(config.endpoint.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(SPARQL_RESULTS_JSON));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("taxalink")),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SparqlEndpoint for HttpSparqlEndpoint {
    fn execute(&self, sparql: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", sparql)])
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ResolverError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text()?)
    }
}
