use std::collections::HashMap;

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

/// Parameters for publishing a message.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PublishParams {
    /// Target topic; falls back to the configured default topic.
    pub topic: Option<String>,
    /// Message body to publish. Required.
    pub message: Option<String>,
    /// Optional string properties attached to the message.
    pub properties: Option<HashMap<String, String>>,
}

/// Parameters for draining messages from a topic.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConsumeParams {
    /// Source topic; falls back to the configured default topic.
    pub topic: Option<String>,
    /// Subscription to consume through; falls back to the configured
    /// default subscription.
    pub subscription_name: Option<String>,
    /// Maximum messages to drain, clamped to 1-100 (default 10).
    pub max_messages: Option<u32>,
}

#[tool_router(router = tool_router_messaging, vis = "pub")]
impl<B: ClusterBackend> PulsarMcp<B> {
    #[tool(description = "Publish a message to a Pulsar topic.")]
    async fn publish(
        &self,
        Parameters(params): Parameters<PublishParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let config = self.session().config();
        let topic = match helpers::require_arg(params.topic, config.default_topic.as_deref(), "topic") {
            Ok(topic) => topic,
            Err(message) => return helpers::error_envelope(message),
        };
        let message = match helpers::require_arg(params.message, None, "message") {
            Ok(message) => message,
            Err(message) => return helpers::error_envelope(message),
        };
        let properties = params.properties.unwrap_or_default();
        let property_count = properties.len();

        match self
            .session()
            .publish(&topic, message.into_bytes(), properties)
            .await
        {
            Ok(message_id) => {
                let mut text =
                    format!("Published message to topic '{topic}' with id {message_id}");
                if property_count > 0 {
                    text.push_str(&format!(" and {property_count} properties"));
                }
                helpers::envelope(json!({ "status": "success", "message": text }))
            }
            Err(err) => helpers::error_envelope(err),
        }
    }

    #[tool(description = "Consume messages from a Pulsar topic through a subscription.")]
    async fn consume(
        &self,
        Parameters(params): Parameters<ConsumeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let config = self.session().config();
        let topic = match helpers::require_arg(params.topic, config.default_topic.as_deref(), "topic") {
            Ok(topic) => topic,
            Err(message) => return helpers::error_envelope(message),
        };
        let subscription = match helpers::require_arg(
            params.subscription_name,
            config.default_subscription.as_deref(),
            "subscription_name",
        ) {
            Ok(subscription) => subscription,
            Err(message) => return helpers::error_envelope(message),
        };
        let max_messages = helpers::clamp_max_messages(params.max_messages);

        match self.session().drain(&topic, &subscription, max_messages).await {
            Ok(messages) => helpers::envelope(json!({
                "status": "success",
                "topic": topic,
                "subscription": subscription,
                "message_count": messages.len(),
                "messages": messages,
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

    fn service(config: PulsarConfig) -> (PulsarMcp<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::new();
        (PulsarMcp::new(backend.clone(), config), backend)
    }

    fn bare_config() -> PulsarConfig {
        PulsarConfig::new("pulsar://localhost:6650", "http://localhost:8080")
    }

    fn envelope_json(result: &CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(result).expect("serializable tool result");
        let text = value["content"][0]["text"]
            .as_str()
            .expect("tool result carries one text content item")
            .to_string();
        serde_json::from_str(&text).expect("envelope is valid json")
    }

    #[tokio::test]
    async fn publish_without_message_is_a_validation_error() {
        let (mcp, backend) = service(bare_config().with_default_topic("orders"));
        let result = mcp
            .publish(Parameters(PublishParams {
                topic: None,
                message: None,
                properties: None,
            }))
            .await
            .unwrap();

        let envelope = envelope_json(&result);
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "message is required");
        assert_eq!(backend.connect_calls(), 0, "no backend call may happen");
    }

    #[tokio::test]
    async fn consume_without_subscription_is_a_validation_error() {
        let (mcp, backend) = service(bare_config().with_default_topic("orders"));
        let result = mcp
            .consume(Parameters(ConsumeParams {
                topic: None,
                subscription_name: None,
                max_messages: None,
            }))
            .await
            .unwrap();

        let envelope = envelope_json(&result);
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "subscription_name is required");
        assert_eq!(backend.connect_calls(), 0, "no backend call may happen");
    }

    #[tokio::test]
    async fn publish_then_consume_round_trips() {
        let (mcp, _backend) = service(bare_config());
        let mut properties = std::collections::HashMap::new();
        properties.insert("origin".to_string(), "test".to_string());

        let published = mcp
            .publish(Parameters(PublishParams {
                topic: Some("orders".to_string()),
                message: Some("hello pulsar".to_string()),
                properties: Some(properties.clone()),
            }))
            .await
            .unwrap();
        assert_eq!(envelope_json(&published)["status"], "success");

        let consumed = mcp
            .consume(Parameters(ConsumeParams {
                topic: Some("orders".to_string()),
                subscription_name: Some("audit".to_string()),
                max_messages: Some(5),
            }))
            .await
            .unwrap();

        let envelope = envelope_json(&consumed);
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["topic"], "orders");
        assert_eq!(envelope["subscription"], "audit");
        assert_eq!(envelope["message_count"], 1);
        assert_eq!(envelope["messages"][0]["data"], "hello pulsar");
        assert_eq!(envelope["messages"][0]["properties"]["origin"], "test");
    }

    #[tokio::test]
    async fn consume_of_empty_topic_reports_success() {
        let (mcp, _backend) = service(bare_config());
        let result = mcp
            .consume(Parameters(ConsumeParams {
                topic: Some("idle".to_string()),
                subscription_name: Some("audit".to_string()),
                max_messages: None,
            }))
            .await
            .unwrap();

        let envelope = envelope_json(&result);
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["message_count"], 0);
        assert!(envelope["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_max_messages_is_clamped() {
        let (mcp, backend) = service(bare_config());
        // 120 queued messages; a clamped drain may return at most 100.
        for _ in 0..120 {
            backend.seed_message("orders", "m");
        }

        let result = mcp
            .consume(Parameters(ConsumeParams {
                topic: Some("orders".to_string()),
                subscription_name: Some("audit".to_string()),
                max_messages: Some(150),
            }))
            .await
            .unwrap();

        let envelope = envelope_json(&result);
        assert_eq!(envelope["message_count"], 100);
    }
}
