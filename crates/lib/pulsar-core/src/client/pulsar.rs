//! Production backend over the `pulsar` client crate (tokio runtime).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use pulsar::consumer::InitialPosition;
use pulsar::message::proto::MessageIdData;
use pulsar::message::Payload;
use pulsar::{
    Authentication,
    Consumer,
    ConsumerOptions,
    DeserializeMessage,
    Error as PulsarError,
    Producer,
    Pulsar,
    SerializeMessage,
    SubType,
    TokioExecutor,
    producer,
};
use tracing::info;

use super::{
    ClientError,
    ClusterBackend,
    ConsumedMessage,
    ConsumerHandle,
    ProducerHandle,
    ReceiveOutcome,
};
use crate::config::{PulsarConfig, ReadPosition, SubscriptionMode};

/// Cluster backend backed by the `pulsar` client crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulsarBackend;

/// Raw payload with per-message properties, sent without a schema.
struct OutboundMessage {
    payload: Vec<u8>,
    properties: HashMap<String, String>,
}

impl SerializeMessage for OutboundMessage {
    fn serialize_message(input: Self) -> Result<producer::Message, PulsarError> {
        Ok(producer::Message {
            payload: input.payload,
            properties: input.properties,
            ..Default::default()
        })
    }
}

/// Marker for consuming raw payload bytes without a schema.
pub struct RawBytes;

impl DeserializeMessage for RawBytes {
    type Output = Vec<u8>;

    fn deserialize_message(payload: &Payload) -> Self::Output {
        payload.data.clone()
    }
}

/// Producer wrapper. The inner handle is dropped on close; the client
/// crate tears down broker-side state with the connection.
pub struct PulsarProducer {
    inner: Option<Producer<TokioExecutor>>,
    topic: String,
}

/// Consumer wrapper with the same drop-on-close discipline.
pub struct PulsarConsumer {
    inner: Option<Consumer<RawBytes, TokioExecutor>>,
}

fn format_message_id(id: &MessageIdData) -> String {
    format!(
        "{}:{}:{}:{}",
        id.ledger_id,
        id.entry_id,
        id.partition(),
        id.batch_index(),
    )
}

#[async_trait]
impl ClusterBackend for PulsarBackend {
    type Client = Pulsar<TokioExecutor>;
    type Producer = PulsarProducer;
    type Consumer = PulsarConsumer;

    async fn connect(&self, config: &PulsarConfig) -> Result<Self::Client, ClientError> {
        let mut builder = Pulsar::builder(config.service_url.as_str(), TokioExecutor);

        if let Some(token) = &config.auth_token {
            builder = builder.with_auth(Authentication {
                name: "token".to_string(),
                data: token.clone().into_bytes(),
            });
        }

        if let Some(path) = &config.tls_trust_certs_file {
            builder = builder
                .with_certificate_chain_file(path)
                .map_err(ClientError::TrustStore)?
                .with_allow_insecure_connection(config.tls_allow_insecure);
        }

        let client = builder
            .build()
            .await
            .map_err(|err| ClientError::Connect(err.to_string()))?;
        info!(service_url = %config.service_url, "connected to pulsar");
        Ok(client)
    }

    async fn create_producer(
        &self,
        client: &Self::Client,
        topic: &str,
    ) -> Result<Self::Producer, ClientError> {
        let producer = client
            .producer()
            .with_topic(topic)
            .with_options(producer::ProducerOptions {
                // Flushes on every message; the broker still sees batched
                // payloads, callers still see per-send receipts.
                batch_size: Some(1),
                ..Default::default()
            })
            .build()
            .await
            .map_err(|err| ClientError::CreateProducer(err.to_string()))?;
        Ok(PulsarProducer {
            inner: Some(producer),
            topic: topic.to_string(),
        })
    }

    async fn subscribe(
        &self,
        client: &Self::Client,
        topic: &str,
        subscription: &str,
        mode: SubscriptionMode,
        position: ReadPosition,
    ) -> Result<Self::Consumer, ClientError> {
        let sub_type = match mode {
            SubscriptionMode::Exclusive => SubType::Exclusive,
            SubscriptionMode::Shared => SubType::Shared,
            SubscriptionMode::Failover => SubType::Failover,
            SubscriptionMode::KeyShared => SubType::KeyShared,
        };
        let initial_position = match position {
            ReadPosition::Earliest => InitialPosition::Earliest,
            ReadPosition::Latest => InitialPosition::Latest,
        };

        let consumer = client
            .consumer()
            .with_topic(topic)
            .with_subscription(subscription)
            .with_subscription_type(sub_type)
            .with_options(ConsumerOptions {
                initial_position,
                ..Default::default()
            })
            .build()
            .await
            .map_err(|err| ClientError::Subscribe(err.to_string()))?;
        Ok(PulsarConsumer {
            inner: Some(consumer),
        })
    }

    async fn close(&self, client: Self::Client) -> Result<(), ClientError> {
        // Dropping the last handle tears down the underlying connections.
        drop(client);
        Ok(())
    }
}

#[async_trait]
impl ProducerHandle for PulsarProducer {
    async fn send(
        &mut self,
        payload: Vec<u8>,
        properties: HashMap<String, String>,
    ) -> Result<String, ClientError> {
        let producer = self
            .inner
            .as_mut()
            .ok_or_else(|| ClientError::Send(format!("producer for '{}' already closed", self.topic)))?;

        let receipt = producer
            .send_non_blocking(OutboundMessage { payload, properties })
            .await
            .map_err(|err| ClientError::Send(err.to_string()))?
            .await
            .map_err(|err| ClientError::Send(err.to_string()))?;

        Ok(receipt
            .message_id
            .as_ref()
            .map_or_else(|| "unknown".to_string(), format_message_id))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.inner.take();
        Ok(())
    }
}

#[async_trait]
impl ConsumerHandle for PulsarConsumer {
    async fn receive(&mut self, timeout: Duration) -> ReceiveOutcome {
        let Some(consumer) = self.inner.as_mut() else {
            return ReceiveOutcome::Fatal(ClientError::Receive(
                "consumer already closed".to_string(),
            ));
        };

        match tokio::time::timeout(timeout, consumer.try_next()).await {
            Err(_) => ReceiveOutcome::Timeout,
            Ok(Err(err)) => ReceiveOutcome::Fatal(ClientError::Receive(err.to_string())),
            Ok(Ok(None)) => {
                ReceiveOutcome::Fatal(ClientError::Receive("message stream ended".to_string()))
            }
            Ok(Ok(Some(message))) => {
                if let Err(err) = consumer.ack(&message).await {
                    return ReceiveOutcome::Fatal(ClientError::Ack(err.to_string()));
                }
                let metadata = &message.payload.metadata;
                ReceiveOutcome::Message(ConsumedMessage {
                    message_id: format_message_id(message.message_id()),
                    data: String::from_utf8_lossy(&message.payload.data).into_owned(),
                    properties: metadata
                        .properties
                        .iter()
                        .map(|kv| (kv.key.clone(), kv.value.clone()))
                        .collect(),
                    topic: message.topic.clone(),
                    publish_timestamp: metadata.publish_time,
                    event_timestamp: metadata.event_time.unwrap_or(0),
                })
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.inner.take();
        Ok(())
    }
}
