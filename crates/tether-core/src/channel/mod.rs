//! Message channel abstraction.
//!
//! The engine never talks to a transport directly. It issues requests and
//! answers inbound requests through a [`MessageChannel`], which carries opaque
//! payloads reliably and in order and pairs every request with one response.
//!
//! Responses are structured JSON values. A file transfer reply is an object
//! with a numeric status field, see [`TransferReply`].

mod loopback;

pub use loopback::LoopbackChannel;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// Content type hint attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Opaque bytes
    Binary,
    /// Structured JSON value
    Json,
    /// Plain text
    Text,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Hints sent along with a request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// What the payload is
    pub content_type: ContentType,
    /// What the caller expects back
    pub response_type: ContentType,
}

impl RequestOptions {
    /// Binary payload expecting a structured response, as used for envelopes
    #[must_use]
    pub const fn binary() -> Self {
        Self {
            content_type: ContentType::Binary,
            response_type: ContentType::Json,
        }
    }
}

/// A request delivered to this side by the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    /// Raw payload
    pub payload: Vec<u8>,
    /// Content type hint set by the sender
    pub content_type: ContentType,
}

/// Handles inbound requests
///
/// Returns `Some(response)` to answer the request or `None` to leave it to
/// another handler.
pub type RequestHandler = Arc<dyn Fn(InboundRequest) -> Option<Value> + Send + Sync>;

/// Called when the channel becomes usable
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Duplex request/response channel to the peer
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a request and wait for its response.
    ///
    /// No timeout is applied; the future resolves when the peer answers or
    /// the channel fails.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if the request could not be delivered or the
    /// peer did not answer it.
    async fn request(&self, payload: Vec<u8>, options: RequestOptions) -> Result<Value, ChannelError>;

    /// Register a handler for requests sent by the peer.
    ///
    /// Handlers are consulted in registration order until one answers.
    fn on_request(&self, handler: RequestHandler);

    /// Register a callback fired once the channel is connected.
    ///
    /// If the channel is already connected the callback fires immediately.
    fn on_ready(&self, callback: ReadyCallback);
}

/// Outcome reported by the receiving side of a file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TransferStatus {
    /// File written
    Ok = 0,
    /// File rejected or not written
    Error = 1,
}

impl From<TransferStatus> for u8 {
    fn from(status: TransferStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for TransferStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(TransferStatus::Ok),
            1 => Ok(TransferStatus::Error),
            other => Err(format!("unknown transfer status {other}")),
        }
    }
}

/// Response body of a file transfer request
///
/// Written as `{"status": 0|1}`. Older peers spell the field `statue`, which
/// is accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReply {
    /// Outcome on the receiving side
    #[serde(alias = "statue")]
    pub status: TransferStatus,
}

impl TransferReply {
    /// Successful reply
    pub const OK: Self = Self {
        status: TransferStatus::Ok,
    };

    /// Failure reply
    pub const ERROR: Self = Self {
        status: TransferStatus::Error,
    };

    /// Reply as a JSON value, ready to hand back to the channel
    #[must_use]
    pub fn to_value(self) -> Value {
        serde_json::json!({ "status": u8::from(self.status) })
    }

    /// Parse a reply out of a channel response
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidResponse`] if the response has no
    /// recognizable status.
    pub fn from_value(value: &Value) -> Result<Self, ChannelError> {
        Self::deserialize(value).map_err(|e| ChannelError::InvalidResponse(e.to_string()))
    }

    /// Whether the peer reported success
    #[must_use]
    pub fn is_ok(self) -> bool {
        self.status == TransferStatus::Ok
    }
}
