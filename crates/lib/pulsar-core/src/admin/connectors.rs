//! Connector resolution over the functions/sources/sinks endpoints.
//!
//! Pulsar IO connectors surface as generic "function" resources with
//! type-specific metadata, so one logical name may answer on any of three
//! endpoints. Resolution probes them in a fixed order and the first 200
//! wins; the order defines precedence when a name collides across kinds.

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{AdminClient, AdminError, TENANT_NAMESPACE, unexpected};

/// Probe precedence for connector resolution.
const PROBE_ORDER: [ConnectorKind; 3] = [
    ConnectorKind::Function,
    ConnectorKind::Source,
    ConnectorKind::Sink,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    Function,
    Source,
    Sink,
}

impl ConnectorKind {
    const fn path_segment(self) -> &'static str {
        match self {
            Self::Function => "functions",
            Self::Source => "sources",
            Self::Sink => "sinks",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Source => "source",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which per-connector endpoint a probe hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    Status,
    Config,
}

/// Result of a successful probe: the kind of endpoint that answered and
/// its JSON payload. Recomputed on every query; never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorDescriptor {
    pub name: String,
    pub kind: ConnectorKind,
    pub payload: Value,
}

/// Aggregated connector listing returned by [`AdminClient::all_connectors`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectorSummary {
    pub source: Vec<String>,
    pub sink: Vec<String>,
    pub total_source: usize,
    pub total_sink: usize,
    pub total: usize,
}

impl AdminClient {
    fn connector_url(&self, kind: ConnectorKind, suffix: &str) -> String {
        format!(
            "{}/admin/v3/{}/{TENANT_NAMESPACE}{suffix}",
            self.base_url,
            kind.path_segment()
        )
    }

    /// Resolves `name` by probing the function, source, and sink endpoints
    /// in that order, short-circuiting on the first 200. `Ok(None)` means
    /// the name answered on none of them.
    pub async fn resolve_connector(
        &self,
        name: &str,
        target: ProbeTarget,
    ) -> Result<Option<ConnectorDescriptor>, AdminError> {
        const OP: &str = "resolve connector";
        for kind in PROBE_ORDER {
            let suffix = match target {
                ProbeTarget::Status => format!("/{name}/status"),
                ProbeTarget::Config => format!("/{name}"),
            };
            let url = self.connector_url(kind, &suffix);
            let response = self
                .authorized(self.http.get(&url))
                .send()
                .await
                .map_err(|source| AdminError::Http { operation: OP, source })?;
            if response.status() == StatusCode::OK {
                let payload = response
                    .json::<Value>()
                    .await
                    .map_err(|source| AdminError::Decode { operation: OP, source })?;
                debug!(%name, %kind, "connector resolved");
                return Ok(Some(ConnectorDescriptor {
                    name: name.to_string(),
                    kind,
                    payload,
                }));
            }
        }
        debug!(%name, "connector not found under any kind");
        Ok(None)
    }

    async fn list_functions(&self) -> Result<Vec<String>, AdminError> {
        const OP: &str = "list functions";
        let url = self.connector_url(ConnectorKind::Function, "");
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

    /// Lists connectors of one kind by classifying every function's
    /// config. This fans out one probe sequence per function; connector
    /// counts are small and this is an introspection path.
    pub async fn list_connectors(&self, kind: ConnectorKind) -> Result<Vec<String>, AdminError> {
        let names = self.list_functions().await?;
        let mut matching = Vec::new();
        for name in names {
            match self.resolve_connector(&name, ProbeTarget::Config).await? {
                Some(descriptor) if matches_kind(&descriptor.payload, kind) => {
                    matching.push(descriptor.name);
                }
                _ => {}
            }
        }
        debug!(%kind, count = matching.len(), "listed connectors");
        Ok(matching)
    }

    /// Aggregates source and sink connectors with counts. Failures
    /// collapse into an empty summary instead of propagating.
    pub async fn all_connectors(&self) -> ConnectorSummary {
        match self.try_all_connectors().await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "failed to aggregate connectors");
                ConnectorSummary::default()
            }
        }
    }

    async fn try_all_connectors(&self) -> Result<ConnectorSummary, AdminError> {
        let source = self.list_connectors(ConnectorKind::Source).await?;
        let sink = self.list_connectors(ConnectorKind::Sink).await?;
        Ok(ConnectorSummary {
            total_source: source.len(),
            total_sink: sink.len(),
            total: source.len() + sink.len(),
            source,
            sink,
        })
    }
}

/// Heuristic connector classification over a decoded function config.
///
/// A function counts as `kind` when its config carries a kind-specific
/// detail object, a same-named key, or the kind name inside its class
/// name or archive path. Kept as one function so a stricter schema check
/// can replace it without touching callers.
fn matches_kind(config: &Value, kind: ConnectorKind) -> bool {
    let marker = match kind {
        ConnectorKind::Source => "source",
        ConnectorKind::Sink => "sink",
        ConnectorKind::Function => return false,
    };
    if config.get(format!("{marker}Details").as_str()).is_some() || config.get(marker).is_some() {
        return true;
    }
    ["className", "archive"].iter().any(|field| {
        config
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|value| value.to_lowercase().contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_object_marks_kind() {
        let config = json!({ "sourceDetails": { "topic": "in" } });
        assert!(matches_kind(&config, ConnectorKind::Source));
        assert!(!matches_kind(&config, ConnectorKind::Sink));
    }

    #[test]
    fn same_named_key_marks_kind() {
        let config = json!({ "sink": { "topic": "out" } });
        assert!(matches_kind(&config, ConnectorKind::Sink));
    }

    #[test]
    fn class_name_substring_is_case_insensitive() {
        let config = json!({ "className": "org.apache.pulsar.io.kafka.KafkaSource" });
        assert!(matches_kind(&config, ConnectorKind::Source));
    }

    #[test]
    fn archive_path_substring_marks_kind() {
        let config = json!({ "archive": "/connectors/pulsar-io-jdbc-sink.nar" });
        assert!(matches_kind(&config, ConnectorKind::Sink));
    }

    #[test]
    fn plain_function_matches_nothing() {
        let config = json!({ "className": "org.example.WordCount" });
        assert!(!matches_kind(&config, ConnectorKind::Source));
        assert!(!matches_kind(&config, ConnectorKind::Sink));
        assert!(!matches_kind(&config, ConnectorKind::Function));
    }
}
