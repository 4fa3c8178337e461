//! Outbound queue and send loop

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{Outgoing, TransferEngine};
use crate::channel::{RequestOptions, TransferReply};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::path::resolve;
use crate::record::{ReadyState, TransferRecord};

impl TransferEngine {
    /// Enqueue a file and run the send loop
    ///
    /// Returns the record once the send loop pass has finished, which for a
    /// successful pass means the peer has answered. By then the record has
    /// already left `pending`, so a listener attached to the returned handle
    /// sees no transitions; use [`TransferEngine::queue_outbound`] followed by
    /// [`TransferEngine::try_send_files`] to observe the whole lifecycle.
    ///
    /// Other records sent in the same pass do not affect the result; their
    /// failures are logged and show up as their own `error` state.
    ///
    /// # Errors
    ///
    /// Fails before queuing anything with [`Error::Path`],
    /// [`Error::FileNotFound`] or [`Error::FileTooLarge`]. Once queued, only a
    /// failure sending this record is returned; see
    /// [`TransferEngine::try_send_files`].
    pub async fn enqueue_outbound(&self, path: &str, params: Option<Value>) -> Result<TransferRecord> {
        let record = self.queue_outbound(path, params)?;
        let outcome = self
            .run_pass()
            .await
            .into_iter()
            .find(|(sent, _)| sent.ptr_eq(&record));

        match outcome {
            Some((_, Err(e))) => Err(e),
            _ => Ok(record),
        }
    }

    /// Enqueue a file without sending it
    ///
    /// The record stays pending until the next send loop pass, so listeners
    /// can be attached before any transition happens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Path`] for a path without a known scheme,
    /// [`Error::FileNotFound`] if storage has nothing at the path,
    /// [`Error::FileTooLarge`] above the configured limit, or
    /// [`Error::Storage`] if the lookup itself fails.
    pub fn queue_outbound(&self, path: &str, params: Option<Value>) -> Result<TransferRecord> {
        let resolved = resolve(path)?;
        let stat = self
            .inner
            .storage
            .stat(&resolved)?
            .ok_or_else(|| Error::FileNotFound(resolved.qualified()))?;

        let limit = self.inner.config.max_file_size;
        let file_size = u32::try_from(stat.size)
            .ok()
            .filter(|size| u64::from(*size) <= limit)
            .ok_or_else(|| Error::FileTooLarge {
                path: resolved.qualified(),
                size: stat.size,
                limit,
            })?;

        let record = TransferRecord::new_outbound(self.inner.ids.next_id(), &resolved, file_size, params);
        debug!(
            session_id = record.session_id(),
            file_path = record.file_path(),
            size = file_size,
            "Queued outbound transfer"
        );

        self.inner.outbound.lock().push(Outgoing {
            record: record.clone(),
            claimed: false,
        });
        Ok(record)
    }

    /// Send every pending record in the outbound queue
    ///
    /// Records are sent in enqueue order with at most
    /// [`max_in_flight`](crate::TransferConfig::max_in_flight) requests
    /// outstanding. A failing record does not stop the others; every record
    /// is attempted and the first failure in queue order is returned.
    ///
    /// A read or encode failure moves the record to `error` before it is
    /// reported. A channel failure is reported without a transition, leaving
    /// the record `transferring`; it is never sent again. With
    /// [`prune_terminal`](crate::TransferConfig::prune_terminal) set, such
    /// records are dropped from the outbound queue together with terminal
    /// ones. Without it, both stay queued until the engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Storage`], [`Error::Envelope`] or
    /// [`Error::Channel`] raised while sending.
    pub async fn try_send_files(&self) -> Result<()> {
        self.run_pass()
            .await
            .into_iter()
            .map(|(_, result)| result)
            .collect()
    }

    /// One send loop pass; results are keyed by record, in queue order
    async fn run_pass(&self) -> Vec<(TransferRecord, Result<()>)> {
        let batch = self.claim_pending();
        let in_flight = self.inner.config.max_in_flight;

        let results: Vec<(TransferRecord, Result<()>)> = stream::iter(batch)
            .map(|record| async move {
                let result = self.send_record(&record).await;
                (record, result)
            })
            .buffered(in_flight)
            .collect()
            .await;

        if self.inner.config.prune_terminal {
            let stalled: Vec<&TransferRecord> = results
                .iter()
                .filter(|(_, result)| matches!(result, Err(Error::Channel(_))))
                .map(|(record, _)| record)
                .collect();
            self.prune(&stalled);
        }

        results
    }

    /// Take every unclaimed pending record for this pass
    fn claim_pending(&self) -> Vec<TransferRecord> {
        self.inner
            .outbound
            .lock()
            .iter_mut()
            .filter(|entry| !entry.claimed && entry.record.ready_state() == ReadyState::Pending)
            .map(|entry| {
                entry.claimed = true;
                entry.record.clone()
            })
            .collect()
    }

    /// Drop terminal records and those stalled by a channel failure
    fn prune(&self, stalled: &[&TransferRecord]) {
        self.inner.outbound.lock().retain(|entry| {
            !entry.record.ready_state().is_terminal()
                && !stalled.iter().any(|record| record.ptr_eq(&entry.record))
        });
    }

    async fn send_record(&self, record: &TransferRecord) -> Result<()> {
        // Canceled after being claimed
        if record.ready_state() != ReadyState::Pending {
            return Ok(());
        }

        let content = match self.load(record) {
            Ok(content) => content,
            Err(e) => {
                error!(
                    session_id = record.session_id(),
                    file_path = record.file_path(),
                    error = %e,
                    "Failed to load outbound file"
                );
                let _ = record.advance(ReadyState::Error);
                return Err(e);
            }
        };

        if record.advance(ReadyState::Transferring).is_err() {
            return Ok(());
        }

        let envelope = Envelope {
            session_id: record.session_id(),
            file_size: record.file_size(),
            file_name: record.file_name().to_string(),
            file_path: record.file_path().to_string(),
            params: record.params().cloned(),
            content,
        };
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    session_id = record.session_id(),
                    error = %e,
                    "Failed to encode envelope"
                );
                let _ = record.advance(ReadyState::Error);
                return Err(e.into());
            }
        };

        debug!(
            session_id = record.session_id(),
            bytes = payload.len(),
            "Sending envelope"
        );
        let response = self
            .inner
            .channel
            .request(payload, RequestOptions::binary())
            .await
            .map_err(|e| {
                error!(session_id = record.session_id(), error = %e, "Channel request failed");
                Error::from(e)
            })?;

        let next = match TransferReply::from_value(&response) {
            Ok(reply) if reply.is_ok() => ReadyState::Transferred,
            Ok(_) => {
                warn!(session_id = record.session_id(), "Peer reported transfer failure");
                ReadyState::Error
            }
            Err(e) => {
                warn!(session_id = record.session_id(), error = %e, "Unrecognized transfer reply");
                ReadyState::Error
            }
        };
        let _ = record.advance(next);
        Ok(())
    }

    fn load(&self, record: &TransferRecord) -> Result<Vec<u8>> {
        let path = record.resolved_path()?;
        Ok(self.inner.storage.read_all(&path)?)
    }
}
