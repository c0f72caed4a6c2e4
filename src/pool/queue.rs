//! Lock-free work queue shared by the dispatcher and all workers.

use crossbeam_queue::SegQueue;

/// Unbounded multi-producer/multi-consumer queue of work items.
///
/// Ordering is roughly FIFO but callers must not rely on it.
pub struct WorkQueue<T> {
    inner: SegQueue<T>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    /// Enqueue an item. Never blocks, never fails.
    #[inline]
    pub fn push(&self, item: T) {
        self.inner.push(item);
    }

    /// Dequeue an item if one is available.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_then_pop() {
        let queue = WorkQueue::new();
        assert!(queue.is_empty());

        queue.push(1u32);
        queue.push(2u32);
        assert_eq!(queue.len(), 2);

        let mut popped = vec![queue.try_pop().unwrap(), queue.try_pop().unwrap()];
        popped.sort();
        assert_eq!(popped, vec![1, 2]);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_empty_pop_returns_none() {
        let queue: WorkQueue<u8> = WorkQueue::default();
        assert!(queue.try_pop().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_concurrent_pop_no_duplicates() {
        let queue = Arc::new(WorkQueue::new());
        for i in 0..10_000u32 {
            queue.push(i);
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(item) = queue.try_pop() {
                        taken.push(item);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for item in handle.join().unwrap() {
                assert!(seen.insert(item), "item {} popped twice", item);
            }
        }
        assert_eq!(seen.len(), 10_000);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_push() {
        let queue = Arc::new(WorkQueue::new());
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 1000);
    }
}
