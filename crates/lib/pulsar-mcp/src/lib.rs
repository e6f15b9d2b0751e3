//! MCP server implementation for the Pulsar tool surface.
//!
//! This crate wires the cluster session and admin client into rmcp tool
//! handlers and exposes the stdio/HTTP runners.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use pulsar_core::{AdminClient, ClusterBackend, ClusterSession, PulsarConfig};
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};

const SERVER_INSTRUCTIONS: &str = r"pulsar-mcp provides tools for working with an Apache Pulsar cluster.

Messaging:
- `publish` sends a message (optionally with string properties) to a topic.
- `consume` drains up to `max_messages` (1-100, default 10) from a topic
  through a named subscription. A partial or empty batch is a normal
  result meaning nothing more was available right now.

Topics (public/default namespace):
- `create_topic` and `delete_topic` are idempotent.
- `list_topics` enumerates topics; `topic_stats` returns raw broker stats.

Connectors:
- `list_connectors` filters by `source` or `sink`.
- `connector_status` / `connector_config` resolve a name by probing the
  function, source, and sink endpoints in that order.
- `all_connectors` aggregates sources and sinks with counts.

Topic and subscription arguments fall back to configured defaults when
those are set. Every tool returns a JSON object with a `status` field of
`success` or `error`.
- `health` returns `ok`.";

/// MCP server wrapper around the cluster session and admin client.
#[derive(Clone)]
pub struct PulsarMcp<B: ClusterBackend> {
    tool_router: ToolRouter<Self>,
    session: Arc<ClusterSession<B>>,
    admin: Arc<AdminClient>,
}

impl<B: ClusterBackend> PulsarMcp<B> {
    /// Creates a server owning a fresh session and admin client.
    #[must_use]
    pub fn new(backend: B, config: PulsarConfig) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(ClusterSession::with_config(backend, config.clone()));
        let admin = Arc::new(AdminClient::new(&config));
        Self::with_parts(session, admin)
    }

    /// Creates a server from shared session and admin handles.
    #[must_use]
    pub fn with_parts(session: Arc<ClusterSession<B>>, admin: Arc<AdminClient>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_messaging()
            + Self::tool_router_topics()
            + Self::tool_router_connectors();
        Self {
            tool_router,
            session,
            admin,
        }
    }

    /// Session handle, e.g. for shutdown handling outside the server.
    #[must_use]
    pub fn session_handle(&self) -> Arc<ClusterSession<B>> {
        self.session.clone()
    }

    pub(crate) fn session(&self) -> &ClusterSession<B> {
        &self.session
    }

    pub(crate) fn admin(&self) -> &AdminClient {
        &self.admin
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<B: ClusterBackend> PulsarMcp<B> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<B: ClusterBackend> ServerHandler for PulsarMcp<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
