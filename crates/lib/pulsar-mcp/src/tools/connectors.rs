use pulsar_core::{ClusterBackend, ConnectorKind, ProbeTarget};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{PulsarMcp, helpers};

/// Parameters for listing connectors of one kind.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListConnectorsParams {
    /// Kind of connectors to list: "source" (default) or "sink".
    pub connector_type: Option<String>,
}

/// Parameters for connector status and config lookups.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConnectorNameParams {
    /// Name of the connector. Required.
    pub connector_name: Option<String>,
}

#[tool_router(router = tool_router_connectors, vis = "pub")]
impl<B: ClusterBackend> PulsarMcp<B> {
    #[tool(description = "List connectors of a given kind (source or sink).")]
    async fn list_connectors(
        &self,
        Parameters(params): Parameters<ListConnectorsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let kind = match params.connector_type.as_deref() {
            None | Some("source") => ConnectorKind::Source,
            Some("sink") => ConnectorKind::Sink,
            Some(other) => {
                return helpers::error_envelope(format!(
                    "connector_type must be 'source' or 'sink', got '{other}'"
                ));
            }
        };

        match self.admin().list_connectors(kind).await {
            Ok(connectors) => helpers::envelope(json!({
                "status": "success",
                "connector_type": kind.as_str(),
                "count": connectors.len(),
                "connectors": connectors,
            })),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "Get the status of a connector by name.")]
    async fn connector_status(
        &self,
        Parameters(params): Parameters<ConnectorNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = match helpers::require_arg(params.connector_name, None, "connector_name") {
            Ok(name) => name,
            Err(message) => return helpers::error_envelope(message),
        };

        match self.admin().resolve_connector(&name, ProbeTarget::Status).await {
            Ok(Some(descriptor)) => helpers::envelope(json!({
                "status": "success",
                "connector_status": {
                    "connector_name": descriptor.name,
                    "status": descriptor.payload,
                    "type": descriptor.kind.as_str(),
                },
            })),
            Ok(None) => helpers::error_envelope(format!(
                "connector '{name}' not found as a function, source, or sink"
            )),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "Get the configuration of a connector by name.")]
    async fn connector_config(
        &self,
        Parameters(params): Parameters<ConnectorNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = match helpers::require_arg(params.connector_name, None, "connector_name") {
            Ok(name) => name,
            Err(message) => return helpers::error_envelope(message),
        };

        match self.admin().resolve_connector(&name, ProbeTarget::Config).await {
            Ok(Some(descriptor)) => helpers::envelope(json!({
                "status": "success",
                "connector_config": {
                    "connector_name": descriptor.name,
                    "config": descriptor.payload,
                    "type": descriptor.kind.as_str(),
                },
            })),
            Ok(None) => helpers::error_envelope(format!(
                "connector '{name}' not found as a function, source, or sink"
            )),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "List all source and sink connectors with counts.")]
    async fn all_connectors(&self) -> Result<CallToolResult, ErrorData> {
        let summary = self.admin().all_connectors().await;
        helpers::envelope(json!({ "status": "success", "connectors": summary }))
    }
}

#[cfg(test)]
mod tests {
    use pulsar_core::PulsarConfig;
    use pulsar_core::client::testing::FakeBackend;

    use super::*;

    #[tokio::test]
    async fn unknown_connector_type_is_a_validation_error() {
        let config = PulsarConfig::new("pulsar://localhost:6650", "http://localhost:8080");
        let mcp = PulsarMcp::new(FakeBackend::new(), config);

        let result = mcp
            .list_connectors(Parameters(ListConnectorsParams {
                connector_type: Some("pipe".to_string()),
            }))
            .await
            .unwrap();

        let value = serde_json::to_value(&result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap();
        let envelope: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["status"], "error");
        assert_eq!(
            envelope["message"],
            "connector_type must be 'source' or 'sink', got 'pipe'"
        );
    }
}
