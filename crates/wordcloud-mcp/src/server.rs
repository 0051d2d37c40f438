//! MCP request dispatcher.
//!
//! The server runs a strictly sequential read-eval-respond loop:
//! 1. Announce capabilities once, before reading anything
//! 2. Handle one message at a time, in input order
//! 3. Stop on EOF
//!
//! Bad input never stops the loop. Only a broken transport does.

use std::panic::{self, AssertUnwindSafe};

use serde_json::{json, Value};

use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolCallResult, ToolsCapability,
    ToolsListResult, MCP_VERSION,
};
use crate::registry::ToolRegistry;
use crate::transport::{IncomingMessage, LineTransport, TransportError};

/// Lifecycle of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Ready,
    Closed,
}

/// MCP server for the word cloud.
pub struct McpServer {
    info: ServerInfo,
    registry: ToolRegistry,
    state: ServerState,
}

impl McpServer {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            registry,
            state: ServerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The capabilities payload, shared by the announcement and `initialize`.
    pub fn capabilities(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
                experimental: json!({}),
            },
            server_info: self.info.clone(),
        }
    }

    /// Run the server loop until EOF.
    ///
    /// Returns an error only when the transport itself fails.
    pub fn run(&mut self, transport: &mut LineTransport) -> Result<(), TransportError> {
        tracing::info!(
            server = %self.info.name,
            tools = self.registry.list().len(),
            "Starting MCP server"
        );

        // Controllers that skip the handshake still learn what we offer.
        let announcement = JsonRpcResponse::from_result(RequestId::from(0), &self.capabilities());
        if let Err(e) = transport.write_response(&announcement) {
            self.state = ServerState::Closed;
            return Err(e.into());
        }
        self.state = ServerState::Ready;

        loop {
            match transport.read_message() {
                Ok(Some(msg)) => {
                    if let Some(resp) = self.handle_message(msg) {
                        if let Err(e) = transport.write_response(&resp) {
                            tracing::error!("Failed to write response: {}", e);
                            self.state = ServerState::Closed;
                            return Err(e.into());
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(TransportError::Framing { line, reason }) => {
                    tracing::warn!(%reason, %line, "Skipping malformed message");
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    self.state = ServerState::Closed;
                    return Err(e);
                }
            }
        }

        self.state = ServerState::Closed;
        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle an incoming message. Notifications never get a response.
    pub fn handle_message(&mut self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    fn handle_request(&mut self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %req.method, id = ?req.id, "Handling request");

        let resp = match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "ping" => self.handle_ping(req.id),
            "tools/list" | "tools/call" if self.state != ServerState::Ready => {
                JsonRpcResponse::error(
                    req.id,
                    JsonRpcError::invalid_request("Server not initialized"),
                )
            }
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params),
            method => {
                tracing::warn!(method, "Ignoring unknown method");
                return None;
            }
        };

        Some(resp)
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    /// Answer `initialize`. Repeats get the same payload.
    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init_params) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init_params.client_info.name,
                        init_params.client_info.version,
                        init_params.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        self.state = ServerState::Ready;
        JsonRpcResponse::from_result(id, &self.capabilities())
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.registry.list(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        tracing::info!(tool = %params.name, "Calling tool");

        let arguments = params.arguments.unwrap_or(Value::Null);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.registry.invoke(&params.name, arguments)
        }));

        let result = match outcome {
            Ok(Ok(value)) => ToolCallResult::json(&value),
            Ok(Err(e)) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool failed");
                ToolCallResult::error(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(tool = %params.name, %message, "Tool panicked");
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error(&format!(
                        "Tool {} panicked: {}",
                        params.name, message
                    )),
                );
            }
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_ping(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({}))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
