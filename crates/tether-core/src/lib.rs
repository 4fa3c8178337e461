//! # Tether Core
//!
//! Single-file transfer between two endpoints over an abstract duplex
//! message channel.
//!
//! This crate provides:
//! - Path resolution for the `assets://` and `data://` namespaces
//! - Envelope encoding and decoding (one file per envelope)
//! - Transfer records with an observable lifecycle
//! - The transfer engine, with inbox and outbox handles
//! - Channel and storage seams, with in-process implementations
//! - Error types and handling
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Inbox / Outbox                               │
//! │   (per-consumer handles: collect received, enqueue outgoing)    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     TransferEngine                               │
//! │   (outbound queue, send loop, inbound handler, inbound queue)   │
//! ├────────────────────────────────┬────────────────────────────────┤
//! │   Envelope codec / records     │   MessageChannel / Storage     │
//! │   (wire layout, lifecycle)     │   (peer link, two namespaces)  │
//! └────────────────────────────────┴────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod event;
pub mod ids;
pub mod mailbox;
pub mod path;
pub mod record;
pub mod storage;

pub use channel::{
    ContentType, InboundRequest, LoopbackChannel, MessageChannel, RequestHandler, RequestOptions,
    TransferReply, TransferStatus,
};
pub use config::TransferConfig;
pub use engine::TransferEngine;
pub use envelope::{ENVELOPE_HEADER_SIZE, Envelope, EnvelopeHeader};
pub use error::{ChannelError, EnvelopeError, Error, PathError, Result, StorageError};
pub use event::EventBus;
pub use ids::{FixedIds, SequentialIds, SessionIdSource};
pub use mailbox::{Inbox, InboxEvent, Outbox};
pub use path::{ASSETS_SCHEME, DATA_SCHEME, Namespace, ResolvedPath, resolve};
pub use record::{ChangeEvent, Direction, ReadyState, TransferRecord};
pub use storage::{FileStat, MemoryStorage, Storage};
