//! Transport layer for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout: one message per line in,
//! one response per line out.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Message that can be received from the client.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Transport failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying stream failed; the connection is unusable.
    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line could not be decoded as a JSON-RPC message. The stream itself
    /// is still fine and the next line can be read.
    #[error("Invalid JSON-RPC message ({reason}): {line}")]
    Framing { line: String, reason: String },
}

impl TransportError {
    fn framing(line: &str, reason: impl ToString) -> Self {
        Self::Framing {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Line-delimited JSON-RPC transport over any reader/writer pair.
pub struct LineTransport {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
}

impl LineTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self {
            reader: Box::new(io::BufReader::new(io::stdin())),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create a transport with a custom reader/writer.
    pub fn new(reader: Box<dyn BufRead + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self { reader, writer }
    }

    /// Read the next JSON-RPC message, skipping blank lines.
    ///
    /// Returns `Ok(None)` on EOF. A message with an `id` member is a request;
    /// one without is a notification.
    pub fn read_message(&mut self) -> Result<Option<IncomingMessage>, TransportError> {
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        let line = line.trim();
        tracing::debug!("Received: {}", line);

        let value: Value =
            serde_json::from_str(line).map_err(|e| TransportError::framing(line, e))?;

        let Some(object) = value.as_object() else {
            return Err(TransportError::framing(line, "expected a JSON object"));
        };

        if object.contains_key("id") {
            serde_json::from_value(value)
                .map(|request| Some(IncomingMessage::Request(request)))
                .map_err(|e| TransportError::framing(line, e))
        } else {
            serde_json::from_value(value)
                .map(|notification| Some(IncomingMessage::Notification(notification)))
                .map_err(|e| TransportError::framing(line, e))
        }
    }

    /// Write a JSON-RPC response to the transport.
    pub fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_line(response)
    }

    fn write_line<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }
}
