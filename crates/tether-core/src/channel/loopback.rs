//! In-process channel connecting two endpoints.
//!
//! Each endpoint of a [`LoopbackChannel::pair`] delivers its requests to the
//! handlers registered on the other endpoint and returns their answer. The
//! pair is connected from the start, so ready callbacks fire on registration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{InboundRequest, MessageChannel, ReadyCallback, RequestHandler, RequestOptions};
use crate::error::ChannelError;

#[derive(Default)]
struct Endpoint {
    handlers: Mutex<Vec<RequestHandler>>,
}

struct Link {
    ends: [Endpoint; 2],
    closed: AtomicBool,
}

/// One end of an in-process channel pair
#[derive(Clone)]
pub struct LoopbackChannel {
    link: Arc<Link>,
    side: usize,
}

impl LoopbackChannel {
    /// Create two connected endpoints
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let link = Arc::new(Link {
            ends: [Endpoint::default(), Endpoint::default()],
            closed: AtomicBool::new(false),
        });
        (
            Self {
                link: Arc::clone(&link),
                side: 0,
            },
            Self { link, side: 1 },
        )
    }

    /// Close both endpoints
    ///
    /// Later requests from either side fail with [`ChannelError::Closed`].
    pub fn close(&self) {
        self.link.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the pair has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.link.closed.load(Ordering::SeqCst)
    }

    fn peer(&self) -> &Endpoint {
        &self.link.ends[1 - self.side]
    }

    fn local(&self) -> &Endpoint {
        &self.link.ends[self.side]
    }
}

#[async_trait]
impl MessageChannel for LoopbackChannel {
    async fn request(&self, payload: Vec<u8>, options: RequestOptions) -> Result<Value, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        // Snapshot so handlers may register more handlers without deadlocking
        let handlers: Vec<RequestHandler> = self.peer().handlers.lock().clone();
        let request = InboundRequest {
            payload,
            content_type: options.content_type,
        };

        handlers
            .iter()
            .find_map(|handler| handler(request.clone()))
            .ok_or(ChannelError::Unhandled)
    }

    fn on_request(&self, handler: RequestHandler) {
        self.local().handlers.lock().push(handler);
    }

    fn on_ready(&self, callback: ReadyCallback) {
        if !self.is_closed() {
            callback();
        }
    }
}

impl std::fmt::Debug for LoopbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackChannel")
            .field("side", &self.side)
            .field("closed", &self.is_closed())
            .field("handlers", &self.local().handlers.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ContentType;
    use serde_json::json;

    #[tokio::test]
    async fn test_request_reaches_peer() {
        let (a, b) = LoopbackChannel::pair();
        b.on_request(Arc::new(|req: InboundRequest| {
            Some(json!({"len": req.payload.len(), "type": req.content_type}))
        }));

        let reply = a.request(vec![1, 2, 3], RequestOptions::binary()).await.unwrap();
        assert_eq!(reply, json!({"len": 3, "type": "binary"}));
    }

    #[tokio::test]
    async fn test_handlers_do_not_answer_own_side() {
        let (a, _b) = LoopbackChannel::pair();
        a.on_request(Arc::new(|_| Some(json!(true))));

        assert_eq!(
            a.request(vec![], RequestOptions::binary()).await,
            Err(ChannelError::Unhandled)
        );
    }

    #[tokio::test]
    async fn test_first_answering_handler_wins() {
        let (a, b) = LoopbackChannel::pair();
        b.on_request(Arc::new(|req: InboundRequest| {
            (req.content_type == ContentType::Text).then(|| json!("text"))
        }));
        b.on_request(Arc::new(|_| Some(json!("fallback"))));

        let options = RequestOptions {
            content_type: ContentType::Text,
            response_type: ContentType::Json,
        };
        assert_eq!(a.request(vec![], options).await.unwrap(), json!("text"));
        assert_eq!(
            a.request(vec![], RequestOptions::binary()).await.unwrap(),
            json!("fallback")
        );
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (a, b) = LoopbackChannel::pair();
        b.on_request(Arc::new(|_| Some(json!(0))));
        b.close();

        assert!(a.is_closed());
        assert_eq!(
            a.request(vec![0], RequestOptions::binary()).await,
            Err(ChannelError::Closed)
        );
    }

    #[test]
    fn test_ready_fires_on_registration() {
        let (a, _b) = LoopbackChannel::pair();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        a.on_ready(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(fired.load(Ordering::SeqCst));
    }
}
