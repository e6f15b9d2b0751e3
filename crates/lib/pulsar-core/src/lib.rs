//! Core session and admin layer for the Pulsar MCP server.
//!
//! This crate owns everything between the stateless tool surface and the
//! cluster: the single cluster session with its producer/consumer
//! lifecycle, the bounded publish/drain message pump, and the stateless
//! admin REST client used for topic lifecycle and connector introspection.

pub mod admin;
pub mod client;
pub mod config;
pub mod session;

pub use admin::{AdminClient, AdminError, ConnectorDescriptor, ConnectorKind, ConnectorSummary, ProbeTarget};
pub use client::pulsar::PulsarBackend;
pub use client::{
    ClientError,
    ClusterBackend,
    ConsumedMessage,
    ConsumerHandle,
    ProducerHandle,
    ReceiveOutcome,
};
pub use config::{PulsarConfig, ReadPosition, SubscriptionMode};
pub use session::{ClusterSession, SessionError};
