//! Inbound request handling

use serde_json::Value;
use tracing::{debug, warn};

use super::TransferEngine;
use crate::channel::{ContentType, InboundRequest, TransferReply};
use crate::envelope::Envelope;
use crate::mailbox::InboxEvent;
use crate::record::{ReadyState, TransferRecord};

impl TransferEngine {
    /// Answer one request from the peer
    ///
    /// Non-binary requests are left to other handlers. Every binary request
    /// gets a reply; failures are contained here and reported to the peer as
    /// [`TransferReply::ERROR`].
    pub(crate) fn handle_request(&self, request: InboundRequest) -> Option<Value> {
        if request.content_type != ContentType::Binary {
            return None;
        }
        Some(self.receive(&request.payload).to_value())
    }

    fn receive(&self, payload: &[u8]) -> TransferReply {
        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(bytes = payload.len(), error = %e, "Dropping malformed envelope");
                return TransferReply::ERROR;
            }
        };

        let record = TransferRecord::from_envelope(&envelope);
        debug!(
            session_id = record.session_id(),
            file_path = record.file_path(),
            size = record.file_size(),
            "Receiving file"
        );
        self.notify_inboxes(InboxEvent::NewFile, &record);

        let target = match record.resolved_path() {
            Ok(target) => target,
            Err(e) => {
                warn!(session_id = record.session_id(), error = %e, "Rejecting inbound file");
                let _ = record.advance(ReadyState::Error);
                return TransferReply::ERROR;
            }
        };

        let _ = record.advance(ReadyState::Transferring);
        if let Err(e) = self.inner.storage.write_all(&target, &envelope.content) {
            warn!(
                session_id = record.session_id(),
                file_path = record.file_path(),
                error = %e,
                "Failed to write inbound file"
            );
            let _ = record.advance(ReadyState::Error);
            return TransferReply::ERROR;
        }

        self.inner.inbound.lock().push_back(record.clone());
        let _ = record.advance(ReadyState::Transferred);
        debug!(
            session_id = record.session_id(),
            bytes = envelope.content.len(),
            "Wrote inbound file"
        );
        self.notify_inboxes(InboxEvent::File, &record);

        TransferReply::OK
    }
}
