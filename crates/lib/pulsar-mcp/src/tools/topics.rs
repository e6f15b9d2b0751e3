use pulsar_core::ClusterBackend;
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

/// Parameters for creating a topic.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateTopicParams {
    /// Name of the topic to create. Required.
    pub topic: Option<String>,
    /// Number of partitions to allocate (default 1).
    pub partitions: Option<u32>,
}

/// Parameters for deleting a topic.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DeleteTopicParams {
    /// Name of the topic to delete. Required.
    pub topic: Option<String>,
}

/// Parameters for fetching topic statistics.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TopicStatsParams {
    /// Name of the topic to get stats for. Required.
    pub topic: Option<String>,
}

#[tool_router(router = tool_router_topics, vis = "pub")]
impl<B: ClusterBackend> PulsarMcp<B> {
    #[tool(description = "Create a new Pulsar topic. Idempotent.")]
    async fn create_topic(
        &self,
        Parameters(params): Parameters<CreateTopicParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let topic = match helpers::require_arg(params.topic, None, "topic") {
            Ok(topic) => topic,
            Err(message) => return helpers::error_envelope(message),
        };
        let partitions = params.partitions.unwrap_or(1).max(1);

        match self.admin().create_topic(&topic, partitions).await {
            Ok(()) => helpers::envelope(json!({
                "status": "success",
                "message": format!("Topic '{topic}' created successfully with {partitions} partitions"),
            })),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "Delete an existing Pulsar topic. Idempotent.")]
    async fn delete_topic(
        &self,
        Parameters(params): Parameters<DeleteTopicParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let topic = match helpers::require_arg(params.topic, None, "topic") {
            Ok(topic) => topic,
            Err(message) => return helpers::error_envelope(message),
        };

        match self.admin().delete_topic(&topic).await {
            Ok(()) => helpers::envelope(json!({
                "status": "success",
                "message": format!("Topic '{topic}' deleted successfully"),
            })),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "List all topics in the public/default namespace.")]
    async fn list_topics(&self) -> Result<CallToolResult, ErrorData> {
        match self.admin().list_topics().await {
            Ok(topics) => helpers::envelope(json!({
                "status": "success",
                "count": topics.len(),
                "topics": topics,
            })),
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "Get statistics and metadata for a topic.")]
    async fn topic_stats(
        &self,
        Parameters(params): Parameters<TopicStatsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let topic = match helpers::require_arg(params.topic, None, "topic") {
            Ok(topic) => topic,
            Err(message) => return helpers::error_envelope(message),
        };

        match self.admin().topic_stats(&topic).await {
            Ok(stats) => helpers::envelope(json!({
                "status": "success",
                "topic": topic,
                "stats": stats,
            })),
            Err(err) => helpers::error_envelope(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use pulsar_core::PulsarConfig;
    use pulsar_core::client::testing::FakeBackend;

    use super::*;

    #[tokio::test]
    async fn create_topic_without_name_is_a_validation_error() {
        let config = PulsarConfig::new("pulsar://localhost:6650", "http://localhost:8080");
        let mcp = PulsarMcp::new(FakeBackend::new(), config);

        let result = mcp
            .create_topic(Parameters(CreateTopicParams {
                topic: None,
                partitions: Some(3),
            }))
            .await
            .unwrap();

        let value = serde_json::to_value(&result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap();
        let envelope: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "topic is required");
    }
}
