//! Backend seam between the session layer and the messaging cluster.
//!
//! The session talks to the cluster only through these traits, so the
//! connection-management and drain logic can be exercised against the
//! scripted in-memory backend in [`testing`] as well as the production
//! backend in [`pulsar`].

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{PulsarConfig, ReadPosition, SubscriptionMode};

pub mod pulsar;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Errors surfaced by a cluster backend.
#[derive(Debug)]
pub enum ClientError {
    Connect(String),
    TrustStore(std::io::Error),
    CreateProducer(String),
    Subscribe(String),
    Send(String),
    Receive(String),
    Ack(String),
    Close(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(message) => write!(f, "failed to connect to cluster: {message}"),
            Self::TrustStore(err) => write!(f, "failed to read TLS trust store: {err}"),
            Self::CreateProducer(message) => write!(f, "failed to create producer: {message}"),
            Self::Subscribe(message) => write!(f, "failed to subscribe: {message}"),
            Self::Send(message) => write!(f, "send failed: {message}"),
            Self::Receive(message) => write!(f, "receive failed: {message}"),
            Self::Ack(message) => write!(f, "acknowledge failed: {message}"),
            Self::Close(message) => write!(f, "close failed: {message}"),
        }
    }
}

impl Error for ClientError {}

/// A message taken off a topic, decoded for the tool surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumedMessage {
    pub message_id: String,
    pub data: String,
    pub properties: HashMap<String, String>,
    pub topic: String,
    pub publish_timestamp: u64,
    pub event_timestamp: u64,
}

/// Outcome of one bounded receive attempt.
///
/// Modeled as a value so the drain loop branches on it instead of catching
/// a timeout error: `Timeout` ends the batch, `Fatal` fails the call.
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// A message arrived and was acknowledged.
    Message(ConsumedMessage),
    /// Nothing arrived within the attempt window.
    Timeout,
    /// The consumer is broken; the surrounding drain must fail.
    Fatal(ClientError),
}

/// Producer bound to a single topic.
#[async_trait]
pub trait ProducerHandle: Send {
    /// Sends one message and returns the cluster-assigned id. One attempt
    /// per call; retries are the caller's business.
    async fn send(
        &mut self,
        payload: Vec<u8>,
        properties: HashMap<String, String>,
    ) -> Result<String, ClientError>;

    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Consumer bound to a single (topic, subscription) pair.
#[async_trait]
pub trait ConsumerHandle: Send {
    /// Attempts one receive. A returned message has already been
    /// acknowledged; an acknowledgement failure comes back as
    /// [`ReceiveOutcome::Fatal`].
    async fn receive(&mut self, timeout: Duration) -> ReceiveOutcome;

    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Factory for cluster connections, producers, and consumers.
#[async_trait]
pub trait ClusterBackend: Send + Sync + 'static {
    type Client: Send + Sync;
    type Producer: ProducerHandle;
    type Consumer: ConsumerHandle;

    async fn connect(&self, config: &PulsarConfig) -> Result<Self::Client, ClientError>;

    async fn create_producer(
        &self,
        client: &Self::Client,
        topic: &str,
    ) -> Result<Self::Producer, ClientError>;

    async fn subscribe(
        &self,
        client: &Self::Client,
        topic: &str,
        subscription: &str,
        mode: SubscriptionMode,
        position: ReadPosition,
    ) -> Result<Self::Consumer, ClientError>;

    async fn close(&self, client: Self::Client) -> Result<(), ClientError>;
}
