//! Transfer records and their lifecycle.
//!
//! A [`TransferRecord`] is a cheap, cloneable handle to one transfer in
//! either direction. Its identity never changes after creation; only the
//! ready state moves, and only forward:
//!
//! ```text
//! pending ──► transferring ──► transferred
//!    │              │
//!    │              └────────► error
//!    ├─────────────────────────► error     (local failure before sending)
//!    └─────────────────────────► canceled  (cancel while still pending)
//! ```
//!
//! Every accepted transition emits a [`ChangeEvent`] to the listeners of
//! that record, synchronously and in transition order.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{Envelope, unwrap_params};
use crate::error::{Error, PathError, Result};
use crate::event::EventBus;
use crate::path::{ResolvedPath, resolve};

/// Lifecycle state of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Queued, nothing sent or written yet
    Pending,
    /// Content loaded and in flight
    Transferring,
    /// Completed successfully
    Transferred,
    /// Failed
    Error,
    /// Canceled before it started
    Canceled,
}

impl ReadyState {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Transferred | Self::Error | Self::Canceled)
    }

    /// Lowercase state name as reported in change events
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Transferring => "transferring",
            Self::Transferred => "transferred",
            Self::Error => "error",
            Self::Canceled => "canceled",
        }
    }

    /// Whether `next` is a legal successor of this state
    #[must_use]
    pub const fn can_advance_to(self, next: ReadyState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Transferring | Self::Error | Self::Canceled)
                | (Self::Transferring, Self::Transferred | Self::Error)
        )
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the channel created the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Enqueued locally for sending
    Outbound,
    /// Received from the peer
    Inbound,
}

/// Event names a record emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEventName {
    /// The ready state changed
    Change,
}

/// Payload of a ready state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Always [`ChangeEvent::TYPE`]
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// The new state
    pub data: ChangeEventData,
    /// UTC milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl ChangeEvent {
    /// Event type tag carried by every change event
    pub const TYPE: &'static str = "readyStateChanged";

    fn now(ready_state: ReadyState) -> Self {
        Self {
            event_type: Self::TYPE,
            data: ChangeEventData { ready_state },
            timestamp: now_millis(),
        }
    }
}

/// Data of a [`ChangeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventData {
    /// The state the record moved to
    pub ready_state: ReadyState,
}

struct RecordInner {
    session_id: i32,
    file_name: String,
    file_path: String,
    params: Option<Value>,
    file_size: u32,
    direction: Direction,
    state: Mutex<ReadyState>,
    // Serializes transition + emission so listeners see transitions in order.
    // Reentrant so a listener may cancel or inspect the record it observes.
    transitions: ReentrantMutex<()>,
    events: EventBus<RecordEventName, ChangeEvent>,
}

/// Handle to one file transfer
///
/// Clones share the same underlying record.
#[derive(Clone)]
pub struct TransferRecord {
    inner: Arc<RecordInner>,
}

impl TransferRecord {
    /// Create a pending outbound record for a file found in storage
    pub(crate) fn new_outbound(
        session_id: i32,
        path: &ResolvedPath,
        file_size: u32,
        params: Option<Value>,
    ) -> Self {
        Self::new(
            Direction::Outbound,
            session_id,
            path.file_name().to_string(),
            path.qualified(),
            params,
            file_size,
        )
    }

    /// Create a pending inbound record from a decoded envelope
    pub(crate) fn from_envelope(envelope: &Envelope) -> Self {
        Self::new(
            Direction::Inbound,
            envelope.session_id,
            envelope.file_name.clone(),
            envelope.file_path.clone(),
            envelope.params.clone(),
            envelope.file_size,
        )
    }

    fn new(
        direction: Direction,
        session_id: i32,
        file_name: String,
        file_path: String,
        params: Option<Value>,
        file_size: u32,
    ) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                session_id,
                file_name,
                file_path,
                params,
                file_size,
                direction,
                state: Mutex::new(ReadyState::Pending),
                transitions: ReentrantMutex::new(()),
                events: EventBus::new(),
            }),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn session_id(&self) -> i32 {
        self.inner.session_id
    }

    /// Base file name
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.inner.file_name
    }

    /// Scheme-qualified file path
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.inner.file_path
    }

    /// Caller metadata
    ///
    /// For inbound records this is the received JSON text wrapped in a JSON
    /// string literal; see [`TransferRecord::decoded_params`].
    #[must_use]
    pub fn params(&self) -> Option<&Value> {
        self.inner.params.as_ref()
    }

    /// Structured params as the sender supplied them
    ///
    /// Outbound records return their params unchanged; inbound records have
    /// the string-literal wrapping removed.
    #[must_use]
    pub fn decoded_params(&self) -> Option<Value> {
        let params = self.inner.params.as_ref()?;
        match self.inner.direction {
            Direction::Outbound => Some(params.clone()),
            Direction::Inbound => unwrap_params(params),
        }
    }

    /// Declared file size in bytes
    #[must_use]
    pub fn file_size(&self) -> u32 {
        self.inner.file_size
    }

    /// Which side created this record
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.inner.direction
    }

    /// Current lifecycle state
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.lock()
    }

    /// Resolve the record's path into namespace and relative path
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] if the path carries no known scheme,
    /// which can only happen for inbound records.
    pub fn resolved_path(&self) -> std::result::Result<ResolvedPath, PathError> {
        resolve(&self.inner.file_path)
    }

    /// Whether both handles refer to the same record
    #[must_use]
    pub fn ptr_eq(&self, other: &TransferRecord) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Listen for ready state changes
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(RecordEventName::Change, listener);
    }

    /// Cancel a transfer that has not started yet
    ///
    /// A pending record moves to [`ReadyState::Canceled`] and is skipped by
    /// the send loop. A record that is already transferring is not
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCancelable`] with the current state if the record
    /// is no longer pending.
    pub fn cancel(&self) -> Result<()> {
        self.advance(ReadyState::Canceled)
            .map_err(Error::NotCancelable)
    }

    /// Move to `next` and notify listeners
    ///
    /// Returns the unchanged current state if `next` is not a legal successor.
    pub(crate) fn advance(&self, next: ReadyState) -> std::result::Result<(), ReadyState> {
        let _ordered = self.inner.transitions.lock();

        {
            let mut state = self.inner.state.lock();
            if !state.can_advance_to(next) {
                tracing::warn!(
                    session_id = self.inner.session_id,
                    from = %*state,
                    to = %next,
                    "Rejected ready state transition"
                );
                return Err(*state);
            }
            *state = next;
        }

        tracing::debug!(
            session_id = self.inner.session_id,
            state = %next,
            "Ready state changed"
        );
        self.inner
            .events
            .emit(RecordEventName::Change, &ChangeEvent::now(next));
        Ok(())
    }
}

impl fmt::Debug for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRecord")
            .field("session_id", &self.inner.session_id)
            .field("file_name", &self.inner.file_name)
            .field("file_path", &self.inner.file_path)
            .field("params", &self.inner.params)
            .field("file_size", &self.inner.file_size)
            .field("direction", &self.inner.direction)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
