//! Bounded newest-first mailbox
//!
//! Filled by a background reader, drained synchronously by the caller. When
//! full the oldest frame is evicted; pops return the newest frame first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<MailboxInner>,
}

struct MailboxInner {
    frames: Mutex<VecDeque<Vec<u8>>>,
    capacity: usize,
    evicted: AtomicU64,
    session: AtomicU64,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(MailboxInner {
                frames: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                evicted: AtomicU64::new(0),
                session: AtomicU64::new(0),
            }),
        }
    }

    fn frames(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, frame: Vec<u8>) {
        let mut frames = self.frames();
        if frames.len() >= self.inner.capacity {
            frames.pop_front();
            self.inner.evicted.fetch_add(1, Ordering::Relaxed);
        }
        frames.push_back(frame);
    }

    /// Take the most recent frame
    pub fn pop_newest(&self) -> Option<Vec<u8>> {
        self.frames().pop_back()
    }

    pub fn len(&self) -> usize {
        self.frames().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }

    pub fn clear(&self) {
        self.frames().clear();
    }

    /// Start a new connection session, discarding frames from the last one
    pub fn begin_session(&self) {
        let mut frames = self.frames();
        frames.clear();
        self.inner.session.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of sessions begun so far
    pub fn session(&self) -> u64 {
        self.inner.session.load(Ordering::Relaxed)
    }

    /// Frames evicted because the mailbox was full
    pub fn evicted(&self) -> u64 {
        self.inner.evicted.load(Ordering::Relaxed)
    }
}
