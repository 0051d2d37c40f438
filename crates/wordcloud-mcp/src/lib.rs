//! MCP (Model Context Protocol) server for wordcloud-tools.
//!
//! This crate implements the stdio JSON-RPC server that exposes the word
//! cloud to AI assistants: protocol types, the line-delimited transport, the
//! tool registry, the word cloud tools, and the request dispatcher.

pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use handlers::WordCloudTools;
pub use registry::{Param, ToolError, ToolRegistry, ToolResult};
pub use server::{McpServer, ServerState};
pub use transport::{IncomingMessage, LineTransport, TransportError};
