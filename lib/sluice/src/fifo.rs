//! Bounded synchronized FIFO feeding the map worker pool.

use std::collections::VecDeque;

use crate::error::PushError;
use crate::sync::{Store, SyncQueue};

struct FifoStore<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Store for FifoStore<T> {
    type Item = T;

    fn can_accept(&self, _item: &T) -> bool {
        self.items.len() < self.capacity
    }

    fn can_yield(&self) -> bool {
        !self.items.is_empty()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn insert(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn remove(&mut self) -> T {
        self.items.pop_front().expect("remove from empty fifo")
    }
}

/// Thread-safe bounded FIFO. `push` blocks while full, `pop` blocks while
/// empty; after `close`, pops drain the remaining items and then report
/// end-of-stream with `None`.
pub struct SyncFifo<T> {
    queue: SyncQueue<FifoStore<T>>,
}

impl<T> SyncFifo<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "fifo capacity must be at least 1");
        Self {
            queue: SyncQueue::new(FifoStore {
                items: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        self.queue.push(item)
    }

    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn len(&self) -> usize {
        self.queue.read(|store| store.len())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.read(|store| store.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn preserves_push_order() {
        let fifo = SyncFifo::new(4);
        fifo.push(1u32).unwrap();
        fifo.push(2).unwrap();
        fifo.push(3).unwrap();
        assert_eq!(fifo.pop(), Some(1));
        assert_eq!(fifo.pop(), Some(2));
        assert_eq!(fifo.pop(), Some(3));
    }

    #[test]
    fn pop_blocks_until_push() {
        let fifo = Arc::new(SyncFifo::new(1));
        let consumer = {
            let fifo = Arc::clone(&fifo);
            thread::spawn(move || fifo.pop())
        };
        thread::sleep(Duration::from_millis(20));
        fifo.push(7u32).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(7));
    }

    #[test]
    fn push_blocks_at_capacity() {
        let fifo = Arc::new(SyncFifo::new(1));
        fifo.push(1u32).unwrap();
        let producer = {
            let fifo = Arc::clone(&fifo);
            thread::spawn(move || fifo.push(2).unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        // The second push is parked; capacity is never exceeded.
        assert_eq!(fifo.len(), 1);
        assert_eq!(fifo.pop(), Some(1));
        producer.join().unwrap();
        assert_eq!(fifo.pop(), Some(2));
    }

    #[test]
    fn close_drains_then_ends() {
        let fifo = SyncFifo::new(4);
        fifo.push(1u32).unwrap();
        fifo.push(2).unwrap();
        fifo.close();
        assert!(fifo.is_closed());
        assert_eq!(fifo.pop(), Some(1));
        assert_eq!(fifo.pop(), Some(2));
        assert_eq!(fifo.pop(), None);
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn push_after_close_returns_item() {
        let fifo = SyncFifo::new(2);
        fifo.close();
        let PushError(value) = fifo.push(9u32).unwrap_err();
        assert_eq!(value, 9);
        // close is idempotent
        fifo.close();
        assert!(fifo.is_closed());
    }

    #[test]
    fn close_unblocks_waiting_consumers() {
        let fifo: Arc<SyncFifo<u32>> = Arc::new(SyncFifo::new(1));
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let fifo = Arc::clone(&fifo);
                thread::spawn(move || fifo.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        fifo.close();
        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn many_producers_many_consumers() {
        const PER_PRODUCER: u64 = 200;
        let fifo = Arc::new(SyncFifo::new(4));
        let producers: Vec<_> = (0..3)
            .map(|p| {
                let fifo = Arc::clone(&fifo);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        fifo.push(p * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let fifo = Arc::clone(&fifo);
                thread::spawn(move || {
                    let mut sum = 0u64;
                    let mut count = 0u64;
                    while let Some(v) = fifo.pop() {
                        sum += v;
                        count += 1;
                    }
                    (sum, count)
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        fifo.close();
        let (sum, count) = consumers
            .into_iter()
            .map(|c| c.join().unwrap())
            .fold((0, 0), |(s, c), (s2, c2)| (s + s2, c + c2));
        assert_eq!(count, 3 * PER_PRODUCER);
        assert_eq!(sum, (0..3 * PER_PRODUCER).sum::<u64>());
    }
}
