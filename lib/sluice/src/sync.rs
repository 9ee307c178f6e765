//! Blocking/admission/closure protocol shared by both pipeline queues.
//!
//! The two stages differ only in their container discipline (FIFO vs
//! index-ordered release), so the mutex/condvar choreography lives here once,
//! parameterized by a [`Store`]. All waits are predicate loops and `close`
//! broadcasts to every waiter, so wakeups cannot be lost.

use std::sync::{Condvar, Mutex};

use crate::error::PushError;

pub(crate) trait Store {
    type Item;

    /// Whether a push of `item` may proceed right now.
    fn can_accept(&self, item: &Self::Item) -> bool;
    /// Whether the head item may be handed to a consumer right now.
    fn can_yield(&self) -> bool;
    /// Terminally empty. Distinct from `!can_yield()`: an ordered store with
    /// a gap at the head cannot yield yet but is not empty.
    fn is_empty(&self) -> bool;
    fn len(&self) -> usize;
    fn insert(&mut self, item: Self::Item);
    fn remove(&mut self) -> Self::Item;

    /// Whether removal can widen admission for more than one blocked
    /// producer at a time.
    const NOTIFY_ALL_ON_REMOVE: bool = false;
}

pub(crate) struct SyncQueue<S: Store> {
    inner: Mutex<Inner<S>>,
    space: Condvar,
    ready: Condvar,
}

struct Inner<S> {
    store: S,
    closed: bool,
}

impl<S: Store> SyncQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                closed: false,
            }),
            space: Condvar::new(),
            ready: Condvar::new(),
        }
    }

    /// Blocks until the store admits the item or the queue is closed. A
    /// closed queue rejects the push and hands the item back, even if the
    /// store would have admitted it.
    pub fn push(&self, item: S::Item) -> Result<(), PushError<S::Item>> {
        let mut inner = self.inner.lock().unwrap();
        while !inner.closed && !inner.store.can_accept(&item) {
            inner = self.space.wait(inner).unwrap();
        }
        if inner.closed {
            return Err(PushError(item));
        }
        inner.store.insert(item);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until the store can yield or the queue is closed and drained.
    /// `None` is the end-of-stream signal: consumers exit on it.
    pub fn pop(&self) -> Option<S::Item> {
        let mut inner = self.inner.lock().unwrap();
        while !inner.store.can_yield() && !(inner.closed && inner.store.is_empty()) {
            inner = self.ready.wait(inner).unwrap();
        }
        if inner.closed && inner.store.is_empty() {
            return None;
        }
        let item = inner.store.remove();
        if S::NOTIFY_ALL_ON_REMOVE {
            self.space.notify_all();
        } else {
            self.space.notify_one();
        }
        Some(item)
    }

    /// Idempotent. Wakes every waiter; in-flight items stay poppable.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.space.notify_all();
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let inner = self.inner.lock().unwrap();
        f(&inner.store)
    }
}
