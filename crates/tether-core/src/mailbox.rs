//! Per-consumer views onto a [`TransferEngine`].
//!
//! An [`Inbox`] collects received files and observes arrivals; an
//! [`Outbox`] enqueues files for sending. Any number of each may be handed
//! out by one engine.

use std::sync::Arc;

use serde_json::Value;

use crate::engine::{InboxBus, TransferEngine};
use crate::error::Result;
use crate::record::TransferRecord;

/// Inbound file notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboxEvent {
    /// An envelope was decoded and is about to be written
    NewFile,
    /// The file was written and queued for collection
    File,
}

/// Receiving side of an engine
pub struct Inbox {
    engine: TransferEngine,
    events: Arc<InboxBus>,
}

impl Inbox {
    pub(crate) fn new(engine: TransferEngine, events: Arc<InboxBus>) -> Self {
        Self { engine, events }
    }

    /// Remove and return the oldest received file, if any
    ///
    /// Never waits; the queue is shared by every inbox of the engine.
    #[must_use]
    pub fn get_next_file(&self) -> Option<TransferRecord> {
        self.engine.pop_inbound()
    }

    /// Listen for inbound file notifications
    ///
    /// Listeners run synchronously inside the engine's request handler.
    pub fn on<F>(&self, event: InboxEvent, listener: F)
    where
        F: Fn(&TransferRecord) + Send + Sync + 'static,
    {
        self.events.on(event, listener);
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox").field("events", &self.events).finish()
    }
}

/// Sending side of an engine
#[derive(Debug, Clone)]
pub struct Outbox {
    engine: TransferEngine,
}

impl Outbox {
    pub(crate) fn new(engine: TransferEngine) -> Self {
        Self { engine }
    }

    /// Enqueue a file and send it
    ///
    /// Resolves only after the peer has answered, so the returned record is
    /// already `transferred` or `error` and its listeners see no transitions.
    /// To observe the lifecycle, use [`Outbox::queue_file`], attach
    /// listeners, then call [`TransferEngine::try_send_files`].
    ///
    /// # Errors
    ///
    /// See [`TransferEngine::enqueue_outbound`].
    pub async fn enqueue_file(&self, path: &str, params: Option<Value>) -> Result<TransferRecord> {
        self.engine.enqueue_outbound(path, params).await
    }

    /// Enqueue a file without sending it yet
    ///
    /// # Errors
    ///
    /// See [`TransferEngine::queue_outbound`].
    pub fn queue_file(&self, path: &str, params: Option<Value>) -> Result<TransferRecord> {
        self.engine.queue_outbound(path, params)
    }
}
