//! Daemon entry point for the Pulsar MCP server.
//!
//! Loads configuration from the environment, sends logs to stderr so the
//! stdio transport stays clean, and serves the MCP protocol over stdio or
//! streamable HTTP. The cluster session is torn down exactly once on the
//! way out.

mod config;

use std::sync::Arc;

use pulsar_core::{AdminClient, ClusterSession, PulsarBackend};
use pulsar_mcp::server::{self, McpHttpServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{DaemonConfig, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::from_args();
    info!(
        service_url = %config.pulsar.service_url,
        admin_url = %config.pulsar.admin_url,
        default_topic = config.pulsar.default_topic.as_deref().unwrap_or("<none>"),
        default_subscription = config.pulsar.default_subscription.as_deref().unwrap_or("<none>"),
        "starting pulsar-mcpd"
    );

    let pulsar = Arc::new(config.pulsar.clone());
    let session = Arc::new(ClusterSession::with_config(PulsarBackend, pulsar.clone()));
    let admin = Arc::new(AdminClient::new(&pulsar));

    let served = match config.transport {
        Transport::Stdio => server::serve_stdio(session.clone(), admin).await,
        Transport::Http => {
            let http = McpHttpServerConfig::new(config.http_addr);
            tokio::select! {
                result = server::serve_streamable_http(session.clone(), admin, http) => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    Ok(())
                }
            }
        }
    };

    session.disconnect().await;
    served
}
