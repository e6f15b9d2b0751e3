//! The single cluster session: connection manager and message pump.
//!
//! A session owns at most one client handle, one producer, and one
//! consumer. Producers rebind when the requested topic changes; consumers
//! rebind when the (topic, subscription) pair changes. The old handle is
//! always released before its replacement is created, and a failed
//! creation leaves nothing bound so the next call starts clean.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{
    ClientError,
    ClusterBackend,
    ConsumedMessage,
    ConsumerHandle,
    ProducerHandle,
    ReceiveOutcome,
};
use crate::config::PulsarConfig;

/// Producer send timeout. One attempt per publish call.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-attempt receive window for [`ClusterSession::drain`].
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum SessionError {
    Connection(ClientError),
    Publish { topic: String, source: ClientError },
    PublishTimeout { topic: String },
    Consume { topic: String, source: ClientError },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "{err}"),
            Self::Publish { topic, source } => {
                write!(f, "failed to publish to topic '{topic}': {source}")
            }
            Self::PublishTimeout { topic } => write!(
                f,
                "publish to topic '{topic}' timed out after {}s",
                SEND_TIMEOUT.as_secs()
            ),
            Self::Consume { topic, source } => {
                write!(f, "failed to consume from topic '{topic}': {source}")
            }
        }
    }
}

impl Error for SessionError {}

struct BoundProducer<P> {
    topic: String,
    inner: P,
}

struct BoundConsumer<C> {
    topic: String,
    subscription: String,
    inner: C,
}

struct SessionState<B: ClusterBackend> {
    client: Option<B::Client>,
    producer: Option<BoundProducer<B::Producer>>,
    consumer: Option<BoundConsumer<B::Consumer>>,
}

impl<B: ClusterBackend> SessionState<B> {
    const fn new() -> Self {
        Self {
            client: None,
            producer: None,
            consumer: None,
        }
    }
}

/// Single logical session against the cluster.
///
/// All operations serialize on one lock around the whole check-binding /
/// replace sequence, so concurrent calls cannot both decide to replace a
/// handle and leak one of the two.
pub struct ClusterSession<B: ClusterBackend> {
    backend: B,
    config: Arc<PulsarConfig>,
    state: Mutex<SessionState<B>>,
}

impl<B: ClusterBackend> ClusterSession<B> {
    pub fn new(backend: B, config: PulsarConfig) -> Self {
        Self::with_config(backend, Arc::new(config))
    }

    pub fn with_config(backend: B, config: Arc<PulsarConfig>) -> Self {
        Self {
            backend,
            config,
            state: Mutex::new(SessionState::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PulsarConfig {
        &self.config
    }

    #[must_use]
    pub fn config_handle(&self) -> Arc<PulsarConfig> {
        self.config.clone()
    }

    /// Connects the session if it is not connected yet. Idempotent. A
    /// failed attempt leaves nothing bound, so the next call simply
    /// retries; no backoff state is kept.
    pub async fn ensure_connected(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await
    }

    async fn connect_locked(&self, state: &mut SessionState<B>) -> Result<(), SessionError> {
        if state.client.is_none() {
            let client = self
                .backend
                .connect(&self.config)
                .await
                .map_err(SessionError::Connection)?;
            info!(service_url = %self.config.service_url, "cluster session connected");
            state.client = Some(client);
        }
        Ok(())
    }

    /// Publishes one message and returns the cluster-assigned id.
    ///
    /// Reuses the bound producer when the topic matches; otherwise the old
    /// producer is released first and a new one is bound to `topic`.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        properties: HashMap<String, String>,
    ) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await?;

        if state.producer.as_ref().is_none_or(|bound| bound.topic != topic) {
            if let Some(mut bound) = state.producer.take() {
                debug!(old_topic = %bound.topic, new_topic = %topic, "replacing producer");
                if let Err(err) = bound.inner.close().await {
                    warn!(topic = %bound.topic, error = %err, "failed to close replaced producer");
                }
            }
            let Some(client) = state.client.as_ref() else {
                return Err(missing_client());
            };
            let producer = self
                .backend
                .create_producer(client, topic)
                .await
                .map_err(|source| SessionError::Publish {
                    topic: topic.to_string(),
                    source,
                })?;
            state.producer = Some(BoundProducer {
                topic: topic.to_string(),
                inner: producer,
            });
            debug!(%topic, "producer bound");
        }

        let Some(bound) = state.producer.as_mut() else {
            return Err(missing_client());
        };
        let message_id = match tokio::time::timeout(
            SEND_TIMEOUT,
            bound.inner.send(payload, properties),
        )
        .await
        {
            Ok(result) => result.map_err(|source| SessionError::Publish {
                topic: topic.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(SessionError::PublishTimeout {
                    topic: topic.to_string(),
                });
            }
        };
        info!(%topic, %message_id, "message published");
        Ok(message_id)
    }

    /// Drains up to `max_messages` messages through `subscription`.
    ///
    /// Performs one receive attempt per requested message with a fixed
    /// per-attempt timeout; the first timeout ends the batch. An empty
    /// batch is a normal result meaning "nothing available right now".
    pub async fn drain(
        &self,
        topic: &str,
        subscription: &str,
        max_messages: usize,
    ) -> Result<Vec<ConsumedMessage>, SessionError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await?;

        let rebind = state
            .consumer
            .as_ref()
            .is_none_or(|bound| bound.topic != topic || bound.subscription != subscription);
        if rebind {
            if let Some(mut bound) = state.consumer.take() {
                debug!(
                    old_topic = %bound.topic,
                    old_subscription = %bound.subscription,
                    "replacing consumer"
                );
                if let Err(err) = bound.inner.close().await {
                    warn!(topic = %bound.topic, error = %err, "failed to close replaced consumer");
                }
            }
            let Some(client) = state.client.as_ref() else {
                return Err(missing_client());
            };
            let consumer = self
                .backend
                .subscribe(
                    client,
                    topic,
                    subscription,
                    self.config.subscription_mode,
                    self.config.read_position,
                )
                .await
                .map_err(|source| SessionError::Consume {
                    topic: topic.to_string(),
                    source,
                })?;
            state.consumer = Some(BoundConsumer {
                topic: topic.to_string(),
                subscription: subscription.to_string(),
                inner: consumer,
            });
            debug!(%topic, %subscription, "consumer bound");
        }

        let Some(bound) = state.consumer.as_mut() else {
            return Err(missing_client());
        };
        let mut messages = Vec::new();
        for _ in 0..max_messages {
            match bound.inner.receive(RECEIVE_TIMEOUT).await {
                ReceiveOutcome::Message(message) => messages.push(message),
                ReceiveOutcome::Timeout => break,
                ReceiveOutcome::Fatal(source) => {
                    return Err(SessionError::Consume {
                        topic: topic.to_string(),
                        source,
                    });
                }
            }
        }
        info!(%topic, %subscription, count = messages.len(), "drained messages");
        Ok(messages)
    }

    /// Releases the consumer, then the producer, then the client handle.
    ///
    /// Individual close failures are logged and swallowed so one failing
    /// release never blocks the others; state always ends cleared.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut bound) = state.consumer.take() {
            if let Err(err) = bound.inner.close().await {
                warn!(topic = %bound.topic, error = %err, "failed to close consumer");
            }
        }
        if let Some(mut bound) = state.producer.take() {
            if let Err(err) = bound.inner.close().await {
                warn!(topic = %bound.topic, error = %err, "failed to close producer");
            }
        }
        if let Some(client) = state.client.take() {
            if let Err(err) = self.backend.close(client).await {
                warn!(error = %err, "failed to close cluster client");
            }
        }
        info!("cluster session disconnected");
    }
}

// The connect-then-bind sequence runs under one lock, so a bound handle
// implies a live client; this only trips if a backend misbehaves.
fn missing_client() -> SessionError {
    SessionError::Connection(ClientError::Connect(
        "session lost its client handle".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::client::testing::FakeBackend;
    use crate::config::PulsarConfig;

    fn test_session() -> (ClusterSession<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::new();
        let config = PulsarConfig::new("pulsar://localhost:6650", "http://localhost:8080");
        (ClusterSession::new(backend.clone(), config), backend)
    }

    fn index_of(events: &[String], needle: &str) -> usize {
        events
            .iter()
            .position(|event| event == needle)
            .unwrap_or_else(|| panic!("event '{needle}' not found in {events:?}"))
    }

    #[tokio::test]
    async fn publish_then_drain_round_trips() {
        let (session, _backend) = test_session();
        let mut properties = HashMap::new();
        properties.insert("trace".to_string(), "abc123".to_string());

        session
            .publish("orders", b"hello".to_vec(), properties.clone())
            .await
            .expect("publish should succeed");
        let messages = session.drain("orders", "audit", 10).await.expect("drain should succeed");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "hello");
        assert_eq!(messages[0].properties, properties);
        assert_eq!(messages[0].topic, "orders");
    }

    #[tokio::test]
    async fn drain_on_empty_topic_returns_empty_batch() {
        let (session, _backend) = test_session();
        let messages = session.drain("idle", "audit", 5).await.expect("empty drain is not an error");
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn drain_stops_at_max_messages() {
        let (session, backend) = test_session();
        for _ in 0..5 {
            backend.seed_message("orders", "m");
        }

        let first = session.drain("orders", "audit", 3).await.unwrap();
        assert_eq!(first.len(), 3);
        let rest = session.drain("orders", "audit", 10).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn producer_rebinds_on_topic_change() {
        let (session, backend) = test_session();
        session.publish("alpha", b"1".to_vec(), HashMap::new()).await.unwrap();
        session.publish("beta", b"2".to_vec(), HashMap::new()).await.unwrap();

        assert_eq!(backend.live_producers(), 1);
        let events = backend.events();
        let opened_alpha = index_of(&events, "producer.open alpha");
        let closed_alpha = index_of(&events, "producer.close alpha");
        let opened_beta = index_of(&events, "producer.open beta");
        assert!(opened_alpha < closed_alpha, "old producer must be released");
        assert!(closed_alpha < opened_beta, "release must happen before replacement");
    }

    #[tokio::test]
    async fn producer_is_reused_for_same_topic() {
        let (session, backend) = test_session();
        session.publish("alpha", b"1".to_vec(), HashMap::new()).await.unwrap();
        session.publish("alpha", b"2".to_vec(), HashMap::new()).await.unwrap();

        let events = backend.events();
        let opens = events.iter().filter(|event| event.starts_with("producer.open")).count();
        assert_eq!(opens, 1);
    }

    #[tokio::test]
    async fn consumer_rebinds_on_subscription_change() {
        let (session, backend) = test_session();
        session.drain("orders", "first", 1).await.unwrap();
        session.drain("orders", "second", 1).await.unwrap();

        assert_eq!(backend.live_consumers(), 1);
        let events = backend.events();
        let opened_first = index_of(&events, "consumer.open orders/first");
        let closed = index_of(&events, "consumer.close orders");
        let opened_second = index_of(&events, "consumer.open orders/second");
        assert!(opened_first < closed && closed < opened_second);
    }

    #[tokio::test]
    async fn connect_failure_is_retryable() {
        let (session, backend) = test_session();
        backend.fail_connect(true);

        let err = session
            .publish("orders", b"1".to_vec(), HashMap::new())
            .await
            .expect_err("publish without a connection must fail");
        assert!(matches!(err, SessionError::Connection(_)));

        backend.fail_connect(false);
        session.publish("orders", b"1".to_vec(), HashMap::new()).await.unwrap();
        assert_eq!(backend.connect_calls(), 2);
    }

    #[tokio::test]
    async fn send_failure_surfaces_publish_error() {
        let (session, backend) = test_session();
        backend.fail_send(true);

        let err = session
            .publish("orders", b"1".to_vec(), HashMap::new())
            .await
            .expect_err("send failure must fail the publish");
        assert!(matches!(err, SessionError::Publish { .. }));
    }

    #[tokio::test]
    async fn fatal_receive_fails_the_drain() {
        let (session, backend) = test_session();
        backend.fail_receive(true);

        let err = session
            .drain("orders", "audit", 5)
            .await
            .expect_err("fatal receive must fail the drain");
        assert!(matches!(err, SessionError::Consume { .. }));
    }

    #[tokio::test]
    async fn disconnect_releases_in_order_and_is_idempotent() {
        let (session, backend) = test_session();
        session.publish("orders", b"1".to_vec(), HashMap::new()).await.unwrap();
        session.drain("orders", "audit", 1).await.unwrap();

        session.disconnect().await;
        let events = backend.events();
        assert_eq!(
            &events[events.len() - 3..],
            &[
                "consumer.close orders".to_string(),
                "producer.close orders".to_string(),
                "client.close".to_string(),
            ]
        );
        assert_eq!(backend.live_producers(), 0);
        assert_eq!(backend.live_consumers(), 0);

        session.disconnect().await;
        assert_eq!(backend.events().len(), events.len(), "second disconnect is a no-op");
    }
}
