//! Transfer engine - owner of both transfer queues
//!
//! The engine binds to one [`MessageChannel`] and one [`Storage`]. It keeps
//! the outbound queue of records waiting to be sent and the inbound queue of
//! received files waiting to be collected, drives the send loop, and answers
//! every binary request the peer sends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether_core::{LoopbackChannel, MemoryStorage, Namespace, TransferEngine};
//!
//! # async fn example() -> tether_core::Result<()> {
//! let (left, right) = LoopbackChannel::pair();
//! let sender_storage = Arc::new(MemoryStorage::new());
//! sender_storage.seed(Namespace::Data, "note.txt", b"0123456789".to_vec());
//!
//! let sender = TransferEngine::new(Arc::new(left), sender_storage)?;
//! let receiver = TransferEngine::new(Arc::new(right), Arc::new(MemoryStorage::new()))?;
//!
//! let inbox = receiver.get_inbox();
//! sender.get_outbox().enqueue_file("data://note.txt", None).await?;
//!
//! let received = inbox.get_next_file().expect("file delivered");
//! assert_eq!(received.file_name(), "note.txt");
//! # Ok(())
//! # }
//! ```

mod inbound;
mod outbound;

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::channel::MessageChannel;
use crate::config::TransferConfig;
use crate::error::Result;
use crate::event::EventBus;
use crate::ids::{SequentialIds, SessionIdSource};
use crate::mailbox::{Inbox, InboxEvent, Outbox};
use crate::record::TransferRecord;
use crate::storage::Storage;

pub(crate) type InboxBus = EventBus<InboxEvent, TransferRecord>;

/// Outbound queue entry
struct Outgoing {
    record: TransferRecord,
    /// Taken by a send loop pass; never handed out twice
    claimed: bool,
}

/// Engine inner state
struct EngineInner {
    /// Channel to the peer
    channel: Arc<dyn MessageChannel>,
    /// Both storage namespaces
    storage: Arc<dyn Storage>,
    /// Session ids for outbound records
    ids: Arc<dyn SessionIdSource>,
    /// Engine configuration
    config: TransferConfig,
    /// Records enqueued for sending, in enqueue order
    outbound: Mutex<Vec<Outgoing>>,
    /// Received files not yet collected, oldest first
    inbound: Mutex<VecDeque<TransferRecord>>,
    /// Event buses of the inboxes handed out, in registration order; owned
    /// by the inboxes, so dropping an inbox unregisters it
    inboxes: Mutex<Vec<Weak<InboxBus>>>,
    /// Outboxes handed out
    outboxes: AtomicUsize,
}

/// File transfer engine
///
/// Cloning is cheap; clones drive the same queues.
#[derive(Clone)]
pub struct TransferEngine {
    inner: Arc<EngineInner>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════════

impl TransferEngine {
    /// Create an engine with the default configuration
    ///
    /// # Errors
    ///
    /// Never fails with the default configuration; the signature matches the
    /// other constructors.
    pub fn new(channel: Arc<dyn MessageChannel>, storage: Arc<dyn Storage>) -> Result<Self> {
        Self::new_with_config(channel, storage, TransferConfig::default())
    }

    /// Create an engine with a custom configuration
    ///
    /// Session ids count up from `config.first_session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the configuration does not validate.
    pub fn new_with_config(
        channel: Arc<dyn MessageChannel>,
        storage: Arc<dyn Storage>,
        config: TransferConfig,
    ) -> Result<Self> {
        let ids = Arc::new(SequentialIds::starting_at(config.first_session_id));
        Self::new_with_ids(channel, storage, config, ids)
    }

    /// Create an engine drawing session ids from `ids`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the configuration does not validate.
    pub fn new_with_ids(
        channel: Arc<dyn MessageChannel>,
        storage: Arc<dyn Storage>,
        config: TransferConfig,
        ids: Arc<dyn SessionIdSource>,
    ) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(EngineInner {
            channel: Arc::clone(&channel),
            storage,
            ids,
            config,
            outbound: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            inboxes: Mutex::new(Vec::new()),
            outboxes: AtomicUsize::new(0),
        });

        // Held weakly: the channel must not keep the engine alive
        let weak = Arc::downgrade(&inner);
        channel.on_request(Arc::new(move |request| {
            let inner = weak.upgrade()?;
            TransferEngine { inner }.handle_request(request)
        }));
        channel.on_ready(Box::new(|| tracing::info!("Message channel ready")));

        Ok(Self { inner })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Consumer Handles
// ═══════════════════════════════════════════════════════════════════════════

impl TransferEngine {
    /// Register and return a new inbox
    ///
    /// Every inbox sees every inbound file notification; queued files are
    /// shared, so each file is returned by exactly one `get_next_file` call.
    #[must_use]
    pub fn get_inbox(&self) -> Inbox {
        let events = Arc::new(InboxBus::new());
        self.inner.inboxes.lock().push(Arc::downgrade(&events));
        Inbox::new(self.clone(), events)
    }

    /// Register and return a new outbox
    #[must_use]
    pub fn get_outbox(&self) -> Outbox {
        self.inner.outboxes.fetch_add(1, Ordering::Relaxed);
        Outbox::new(self.clone())
    }

    /// Remove the oldest received file
    pub(crate) fn pop_inbound(&self) -> Option<TransferRecord> {
        self.inner.inbound.lock().pop_front()
    }

    /// Fire `event` on every live inbox, in registration order
    fn notify_inboxes(&self, event: InboxEvent, record: &TransferRecord) {
        for inbox in self.live_inboxes() {
            inbox.emit(event, record);
        }
    }

    /// Buses of inboxes still held by a consumer; forgets dropped ones
    fn live_inboxes(&self) -> Vec<Arc<InboxBus>> {
        let mut inboxes = self.inner.inboxes.lock();
        inboxes.retain(|bus| bus.strong_count() > 0);
        inboxes.iter().filter_map(Weak::upgrade).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Introspection
// ═══════════════════════════════════════════════════════════════════════════

impl TransferEngine {
    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &TransferConfig {
        &self.inner.config
    }

    /// Records currently in the outbound queue, in enqueue order
    #[must_use]
    pub fn outbound_records(&self) -> Vec<TransferRecord> {
        self.inner
            .outbound
            .lock()
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Received files waiting to be collected
    #[must_use]
    pub fn inbound_len(&self) -> usize {
        self.inner.inbound.lock().len()
    }

    /// Inboxes handed out and not yet dropped
    #[must_use]
    pub fn inbox_count(&self) -> usize {
        self.live_inboxes().len()
    }

    /// Outboxes handed out
    #[must_use]
    pub fn outbox_count(&self) -> usize {
        self.inner.outboxes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("config", &self.inner.config)
            .field("outbound", &self.inner.outbound.lock().len())
            .field("inbound", &self.inbound_len())
            .field("inboxes", &self.inbox_count())
            .field("outboxes", &self.outbox_count())
            .finish()
    }
}
