//! Session id sources.
//!
//! Outbound transfers take their session id from an injected
//! [`SessionIdSource`] so tests can predict them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::Mutex;

/// Issues session ids for outbound transfers
pub trait SessionIdSource: Send + Sync {
    /// Next session id
    fn next_id(&self) -> i32;
}

/// Monotonically advancing ids, wrapping at `i32::MAX`
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicI32,
}

impl SequentialIds {
    /// Start issuing at `first`
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl SessionIdSource for SequentialIds {
    fn next_id(&self) -> i32 {
        // fetch_add wraps on overflow
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Scripted ids, falling back to a sequence once the script runs out
#[derive(Debug)]
pub struct FixedIds {
    script: Mutex<VecDeque<i32>>,
    fallback: SequentialIds,
}

impl FixedIds {
    /// Issue `ids` in order, then continue from the last scripted id plus one
    pub fn new(ids: impl IntoIterator<Item = i32>) -> Self {
        let script: VecDeque<i32> = ids.into_iter().collect();
        let next = script.back().map_or(1, |last| last.wrapping_add(1));
        Self {
            script: Mutex::new(script),
            fallback: SequentialIds::starting_at(next),
        }
    }
}

impl SessionIdSource for FixedIds {
    fn next_id(&self) -> i32 {
        match self.script.lock().pop_front() {
            Some(id) => id,
            None => self.fallback.next_id(),
        }
    }
}
