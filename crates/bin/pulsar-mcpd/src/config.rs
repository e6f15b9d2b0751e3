use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use pulsar_core::{PulsarConfig, ReadPosition, SubscriptionMode};

const DEFAULT_SERVICE_URL: &str = "pulsar://localhost:6650";
const DEFAULT_ADMIN_URL: &str = "http://localhost:8080";
const DEFAULT_SUBSCRIPTION_TYPE: &str = "Shared";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:4030";

/// Transport used to expose the MCP tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "pulsar-mcpd", version, about = "Pulsar MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "PULSAR_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    service_url: String,

    #[arg(long, env = "PULSAR_ADMIN_URL", default_value = DEFAULT_ADMIN_URL)]
    admin_url: String,

    #[arg(long, env = "PULSAR_DEFAULT_TOPIC")]
    default_topic: Option<String>,

    #[arg(long, env = "PULSAR_DEFAULT_SUBSCRIPTION")]
    default_subscription: Option<String>,

    #[arg(
        long,
        env = "PULSAR_SUBSCRIPTION_TYPE",
        default_value = DEFAULT_SUBSCRIPTION_TYPE
    )]
    subscription_type: String,

    #[arg(
        long,
        env = "PULSAR_READ_FROM_BEGINNING",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    read_from_beginning: bool,

    #[arg(long, env = "PULSAR_TOKEN")]
    token: Option<String>,

    #[arg(long, env = "PULSAR_TLS_TRUST_CERTS_FILE")]
    tls_trust_certs_file: Option<PathBuf>,

    #[arg(
        long,
        env = "PULSAR_TLS_ALLOW_INSECURE",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    tls_allow_insecure: bool,

    #[arg(long, env = "PULSAR_MCP_TRANSPORT", value_enum, default_value = "stdio")]
    transport: Transport,

    #[arg(long, env = "PULSAR_MCP_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    http_addr: SocketAddr,
}

/// Runtime configuration resolved from CLI arguments and environment
/// variables.
#[derive(Clone)]
pub struct DaemonConfig {
    pub pulsar: PulsarConfig,
    pub transport: Transport,
    pub http_addr: SocketAddr,
}

impl DaemonConfig {
    pub fn from_args() -> Self {
        Self::from(CliArgs::parse())
    }
}

impl From<CliArgs> for DaemonConfig {
    fn from(args: CliArgs) -> Self {
        let mut pulsar = PulsarConfig::new(args.service_url, args.admin_url)
            .with_subscription_mode(SubscriptionMode::parse(&args.subscription_type))
            .with_read_position(ReadPosition::from_beginning(args.read_from_beginning))
            .with_tls_allow_insecure(args.tls_allow_insecure);

        if let Some(topic) = args.default_topic.filter(|value| !value.trim().is_empty()) {
            pulsar = pulsar.with_default_topic(topic);
        }
        if let Some(subscription) = args
            .default_subscription
            .filter(|value| !value.trim().is_empty())
        {
            pulsar = pulsar.with_default_subscription(subscription);
        }
        if let Some(token) = args.token.filter(|value| !value.trim().is_empty()) {
            pulsar = pulsar.with_auth_token(token);
        }
        if let Some(path) = args.tls_trust_certs_file {
            pulsar = pulsar.with_tls_trust_certs_file(path);
        }

        Self {
            pulsar,
            transport: args.transport,
            http_addr: args.http_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            admin_url: DEFAULT_ADMIN_URL.to_string(),
            default_topic: None,
            default_subscription: None,
            subscription_type: DEFAULT_SUBSCRIPTION_TYPE.to_string(),
            read_from_beginning: false,
            token: None,
            tls_trust_certs_file: None,
            tls_allow_insecure: false,
            transport: Transport::Stdio,
            http_addr: DEFAULT_HTTP_ADDR.parse().expect("valid HTTP addr"),
        }
    }

    #[test]
    fn unknown_subscription_type_falls_back_to_shared() {
        let mut args = base_args();
        args.subscription_type = "RoundRobin".to_string();

        let config = DaemonConfig::from(args);
        assert_eq!(config.pulsar.subscription_mode, SubscriptionMode::Shared);
    }

    #[test]
    fn read_from_beginning_selects_earliest() {
        let mut args = base_args();
        args.read_from_beginning = true;

        let config = DaemonConfig::from(args);
        assert_eq!(config.pulsar.read_position, ReadPosition::Earliest);
    }

    #[test]
    fn blank_defaults_are_dropped() {
        let mut args = base_args();
        args.default_topic = Some("  ".to_string());
        args.default_subscription = Some(String::new());
        args.token = Some(String::new());

        let config = DaemonConfig::from(args);
        assert!(config.pulsar.default_topic.is_none());
        assert!(config.pulsar.default_subscription.is_none());
        assert!(config.pulsar.auth_token.is_none());
    }
}
