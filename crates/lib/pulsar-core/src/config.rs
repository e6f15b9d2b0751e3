//! Runtime configuration shared by the cluster session and admin client.

use std::path::PathBuf;

/// Delivery mode of a consumer subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    Exclusive,
    Shared,
    Failover,
    KeyShared,
}

impl SubscriptionMode {
    /// Maps a configured mode name onto a mode. Anything unrecognized
    /// (including casing variants) falls back to `Shared`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Exclusive" => Self::Exclusive,
            "Failover" => Self::Failover,
            "KeyShared" => Self::KeyShared,
            _ => Self::Shared,
        }
    }
}

/// Where a newly created consumer starts reading. Fixed at consumer
/// creation time; not reconfigurable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPosition {
    Earliest,
    Latest,
}

impl ReadPosition {
    #[must_use]
    pub fn from_beginning(read_from_beginning: bool) -> Self {
        if read_from_beginning {
            Self::Earliest
        } else {
            Self::Latest
        }
    }
}

/// Connection and defaulting configuration for one cluster.
#[derive(Debug, Clone)]
pub struct PulsarConfig {
    /// Broker service URL, e.g. `pulsar://localhost:6650`.
    pub service_url: String,
    /// Admin REST base URL, e.g. `http://localhost:8080`.
    pub admin_url: String,
    /// Topic used when a tool call omits one.
    pub default_topic: Option<String>,
    /// Subscription name used when a consume call omits one.
    pub default_subscription: Option<String>,
    pub subscription_mode: SubscriptionMode,
    pub read_position: ReadPosition,
    /// Bearer token for both the broker and the admin API.
    pub auth_token: Option<String>,
    pub tls_trust_certs_file: Option<PathBuf>,
    pub tls_allow_insecure: bool,
}

impl PulsarConfig {
    #[must_use]
    pub fn new(service_url: impl Into<String>, admin_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            admin_url: admin_url.into(),
            default_topic: None,
            default_subscription: None,
            subscription_mode: SubscriptionMode::Shared,
            read_position: ReadPosition::Latest,
            auth_token: None,
            tls_trust_certs_file: None,
            tls_allow_insecure: false,
        }
    }

    #[must_use]
    pub fn with_default_topic(mut self, topic: impl Into<String>) -> Self {
        self.default_topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_default_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.default_subscription = Some(subscription.into());
        self
    }

    #[must_use]
    pub const fn with_subscription_mode(mut self, mode: SubscriptionMode) -> Self {
        self.subscription_mode = mode;
        self
    }

    #[must_use]
    pub const fn with_read_position(mut self, position: ReadPosition) -> Self {
        self.read_position = position;
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_tls_trust_certs_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_trust_certs_file = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_tls_allow_insecure(mut self, allow: bool) -> Self {
        self.tls_allow_insecure = allow;
        self
    }
}
