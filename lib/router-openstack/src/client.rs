//! Authenticated HTTP client for OpenStack service endpoints

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use router_core::{CoreError, ResourceKind, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Clone, Copy, Debug)]
enum Operation {
    Read,
    Write,
}

impl Operation {
    fn failed(self, kind: ResourceKind, id: &str, reason: impl std::fmt::Display) -> CoreError {
        match self {
            Operation::Read => CoreError::request_failed(kind, id, reason),
            Operation::Write => CoreError::write_failed(kind, id, reason),
        }
    }
}

/// Endpoints and credentials for the OpenStack APIs
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OpenStackOpts {
    /// Nova endpoint including the API version (e.g. "https://nova:8774/v2.1")
    pub compute_endpoint: String,

    /// Neutron endpoint without the API version (e.g. "https://neutron:9696")
    pub network_endpoint: String,

    /// Pre-issued Keystone token
    #[serde(default, skip_serializing)]
    pub auth_token: String,

    /// Timeout for a single API request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// OpenStackClient wraps a reqwest client carrying the auth token
#[derive(Clone)]
pub struct OpenStackClient {
    http: Client,
    token: Arc<str>,
    compute_endpoint: Arc<str>,
    network_endpoint: Arc<str>,
}

impl OpenStackClient {
    /// Create a new OpenStack client
    pub fn new(opts: &OpenStackOpts) -> anyhow::Result<Self> {
        if opts.compute_endpoint.is_empty() || opts.network_endpoint.is_empty() {
            anyhow::bail!("compute_endpoint and network_endpoint must both be set");
        }
        if opts.auth_token.is_empty() {
            anyhow::bail!("auth_token must be set");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(opts.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            token: opts.auth_token.as_str().into(),
            compute_endpoint: opts.compute_endpoint.trim_end_matches('/').into(),
            network_endpoint: opts.network_endpoint.trim_end_matches('/').into(),
        })
    }

    /// URL of `path` under the compute endpoint
    pub fn compute_url(&self, path: &str) -> String {
        format!("{}/{}", self.compute_endpoint, path.trim_start_matches('/'))
    }

    /// URL of `path` under the network endpoint
    pub fn network_url(&self, path: &str) -> String {
        format!("{}/{}", self.network_endpoint, path.trim_start_matches('/'))
    }

    /// GET `url` and decode the JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        kind: ResourceKind,
        id: &str,
    ) -> Result<T> {
        debug!("GET {}", url);
        let request = self.http.get(url).query(query);
        let response = self.send(request, kind, id, Operation::Read).await?;
        response
            .json()
            .await
            .map_err(|e| Operation::Read.failed(kind, id, e))
    }

    /// PUT `body` to `url` and decode the JSON response
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        kind: ResourceKind,
        id: &str,
    ) -> Result<T> {
        debug!("PUT {}", url);
        let request = self.http.put(url).json(body);
        let response = self.send(request, kind, id, Operation::Write).await?;
        response
            .json()
            .await
            .map_err(|e| Operation::Write.failed(kind, id, e))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        kind: ResourceKind,
        id: &str,
        operation: Operation,
    ) -> Result<Response> {
        let response = request
            .header(AUTH_TOKEN_HEADER, &*self.token)
            .send()
            .await
            .map_err(|e| operation.failed(kind, id, e))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(CoreError::not_found(kind, id)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(operation.failed(kind, id, format!("{}: {}", status, body.trim())))
            }
        }
    }
}
