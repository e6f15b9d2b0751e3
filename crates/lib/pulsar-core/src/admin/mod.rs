//! Stateless HTTP operations against the cluster's admin REST surface.
//!
//! Every call here is an independent request carrying the optional bearer
//! token; nothing touches the cluster session. Idempotent topic lifecycle
//! follows the admin API's status-code contract: "already in the target
//! state" counts as success.

use std::error::Error;
use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::PulsarConfig;

pub mod connectors;

pub use connectors::{ConnectorDescriptor, ConnectorKind, ConnectorSummary, ProbeTarget};

/// Tenant/namespace all topic and connector paths are rooted at.
const TENANT_NAMESPACE: &str = "public/default";

#[derive(Debug)]
pub enum AdminError {
    Http {
        operation: &'static str,
        source: reqwest::Error,
    },
    UnexpectedStatus {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
    Decode {
        operation: &'static str,
        source: reqwest::Error,
    },
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { operation, source } => {
                write!(f, "{operation} request failed: {source}")
            }
            Self::UnexpectedStatus {
                operation,
                status,
                body,
            } => write!(f, "{operation} returned {status}: {body}"),
            Self::Decode { operation, source } => {
                write!(f, "failed to decode {operation} response: {source}")
            }
        }
    }
}

impl Error for AdminError {}

/// Client for the admin REST API.
#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl AdminClient {
    #[must_use]
    pub fn new(config: &PulsarConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.admin_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn topic_url(&self, suffix: &str) -> String {
        format!("{}/admin/v2/persistent/{TENANT_NAMESPACE}{suffix}", self.base_url)
    }

    /// Creates a partitioned topic. Both 204 (created) and 409 (already
    /// exists) are success.
    pub async fn create_topic(&self, topic: &str, partitions: u32) -> Result<(), AdminError> {
        const OP: &str = "create topic";
        let url = self.topic_url(&format!("/{topic}/partitions"));
        let response = self
            .authorized(self.http.put(&url).json(&partitions))
            .send()
            .await
            .map_err(|source| AdminError::Http { operation: OP, source })?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::CONFLICT => {
                debug!(%topic, partitions, "topic created or already present");
                Ok(())
            }
            status => Err(unexpected(OP, status, response).await),
        }
    }

    /// Deletes a topic. Both 204 (deleted) and 404 (already absent) are
    /// success.
    pub async fn delete_topic(&self, topic: &str) -> Result<(), AdminError> {
        const OP: &str = "delete topic";
        let url = self.topic_url(&format!("/{topic}"));
        let response = self
            .authorized(self.http.delete(&url))
            .send()
            .await
            .map_err(|source| AdminError::Http { operation: OP, source })?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                debug!(%topic, "topic deleted or already absent");
                Ok(())
            }
            status => Err(unexpected(OP, status, response).await),
        }
    }

    pub async fn list_topics(&self) -> Result<Vec<String>, AdminError> {
        const OP: &str = "list topics";
        let url = self.topic_url("");
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|source| AdminError::Http { operation: OP, source })?;
        match response.status() {
            StatusCode::OK => response
                .json::<Vec<String>>()
                .await
                .map_err(|source| AdminError::Decode { operation: OP, source }),
            status => Err(unexpected(OP, status, response).await),
        }
    }

    /// Fetches topic statistics. The structure is opaque to this layer and
    /// passed through as-is.
    pub async fn topic_stats(&self, topic: &str) -> Result<Value, AdminError> {
        const OP: &str = "topic stats";
        let url = self.topic_url(&format!("/{topic}/stats"));
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|source| AdminError::Http { operation: OP, source })?;
        match response.status() {
            StatusCode::OK => response
                .json::<Value>()
                .await
                .map_err(|source| AdminError::Decode { operation: OP, source }),
            status => Err(unexpected(OP, status, response).await),
        }
    }
}

async fn unexpected(operation: &'static str, status: StatusCode, response: Response) -> AdminError {
    let body = response.text().await.unwrap_or_default();
    AdminError::UnexpectedStatus {
        operation,
        status,
        body,
    }
}
