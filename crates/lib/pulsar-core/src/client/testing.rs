//! Scripted in-memory backend for exercising the session layer.
//!
//! Producers feed a per-topic queue, consumers pop from it, and every
//! lifecycle step is recorded so tests can assert ordering and leaks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ClientError,
    ClusterBackend,
    ConsumedMessage,
    ConsumerHandle,
    ProducerHandle,
    ReceiveOutcome,
};
use crate::config::{PulsarConfig, ReadPosition, SubscriptionMode};

#[derive(Default)]
struct FakeState {
    fail_connect: bool,
    fail_send: bool,
    fail_receive: bool,
    connect_calls: usize,
    next_message_id: u64,
    topics: HashMap<String, VecDeque<ConsumedMessage>>,
    events: Vec<String>,
    live_producers: usize,
    live_consumers: usize,
}

/// In-memory cluster backend with injectable failures.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    pub fn fail_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_send = fail;
    }

    pub fn fail_receive(&self, fail: bool) {
        self.state.lock().unwrap().fail_receive = fail;
    }

    /// Number of connect attempts, failed ones included.
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.state.lock().unwrap().connect_calls
    }

    #[must_use]
    pub fn live_producers(&self) -> usize {
        self.state.lock().unwrap().live_producers
    }

    #[must_use]
    pub fn live_consumers(&self) -> usize {
        self.state.lock().unwrap().live_consumers
    }

    /// Everything that happened, in order, e.g. `producer.open orders`.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    /// Queues a message directly, bypassing any producer.
    pub fn seed_message(&self, topic: &str, data: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_message_id += 1;
        let message = ConsumedMessage {
            message_id: format!("fake-{}", state.next_message_id),
            data: data.to_string(),
            properties: HashMap::new(),
            topic: topic.to_string(),
            publish_timestamp: state.next_message_id,
            event_timestamp: 0,
        };
        state.topics.entry(topic.to_string()).or_default().push_back(message);
    }
}

pub struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

pub struct FakeProducer {
    topic: String,
    state: Arc<Mutex<FakeState>>,
}

pub struct FakeConsumer {
    topic: String,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl ClusterBackend for FakeBackend {
    type Client = FakeClient;
    type Producer = FakeProducer;
    type Consumer = FakeConsumer;

    async fn connect(&self, _config: &PulsarConfig) -> Result<Self::Client, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls += 1;
        if state.fail_connect {
            return Err(ClientError::Connect("injected connect failure".to_string()));
        }
        state.events.push("client.connect".to_string());
        Ok(FakeClient {
            state: self.state.clone(),
        })
    }

    async fn create_producer(
        &self,
        client: &Self::Client,
        topic: &str,
    ) -> Result<Self::Producer, ClientError> {
        let mut state = client.state.lock().unwrap();
        state.events.push(format!("producer.open {topic}"));
        state.live_producers += 1;
        Ok(FakeProducer {
            topic: topic.to_string(),
            state: client.state.clone(),
        })
    }

    async fn subscribe(
        &self,
        client: &Self::Client,
        topic: &str,
        subscription: &str,
        _mode: SubscriptionMode,
        _position: ReadPosition,
    ) -> Result<Self::Consumer, ClientError> {
        let mut state = client.state.lock().unwrap();
        state.events.push(format!("consumer.open {topic}/{subscription}"));
        state.live_consumers += 1;
        Ok(FakeConsumer {
            topic: topic.to_string(),
            state: client.state.clone(),
        })
    }

    async fn close(&self, client: Self::Client) -> Result<(), ClientError> {
        client.state.lock().unwrap().events.push("client.close".to_string());
        Ok(())
    }
}

#[async_trait]
impl ProducerHandle for FakeProducer {
    async fn send(
        &mut self,
        payload: Vec<u8>,
        properties: HashMap<String, String>,
    ) -> Result<String, ClientError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(ClientError::Send("injected send failure".to_string()));
        }
        state.next_message_id += 1;
        let message_id = format!("fake-{}", state.next_message_id);
        let message = ConsumedMessage {
            message_id: message_id.clone(),
            data: String::from_utf8_lossy(&payload).into_owned(),
            properties,
            topic: self.topic.clone(),
            publish_timestamp: state.next_message_id,
            event_timestamp: 0,
        };
        state
            .topics
            .entry(self.topic.clone())
            .or_default()
            .push_back(message);
        state.events.push(format!("producer.send {}", self.topic));
        Ok(message_id)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.live_producers -= 1;
        state.events.push(format!("producer.close {}", self.topic));
        Ok(())
    }
}

#[async_trait]
impl ConsumerHandle for FakeConsumer {
    async fn receive(&mut self, _timeout: Duration) -> ReceiveOutcome {
        let mut state = self.state.lock().unwrap();
        if state.fail_receive {
            return ReceiveOutcome::Fatal(ClientError::Receive(
                "injected receive failure".to_string(),
            ));
        }
        match state.topics.get_mut(&self.topic).and_then(VecDeque::pop_front) {
            Some(message) => ReceiveOutcome::Message(message),
            None => ReceiveOutcome::Timeout,
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.live_consumers -= 1;
        state.events.push(format!("consumer.close {}", self.topic));
        Ok(())
    }
}
