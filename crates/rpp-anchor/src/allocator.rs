use std::sync::atomic::{AtomicU16, Ordering};

use rpp_types::WINDOW_ID_MAX;
use tracing::debug;

/// Rolling window id source over `1..=0xFFE`.
///
/// Ids wrap back to 1 after the last one; 0 and 0xFFF are never issued.
/// An id handed out again after a wrap reuses whatever slot it maps to.
#[derive(Debug)]
pub struct WindowAllocator {
    next: AtomicU16,
}

impl Default for WindowAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU16::new(1),
        }
    }

    /// Issue the next window id.
    pub fn allocate(&self) -> u16 {
        let id = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(id % WINDOW_ID_MAX + 1)
            })
            .unwrap_or_else(|id| id);
        if id == WINDOW_ID_MAX {
            debug!(window_id = id, "Window allocation wrapped");
        }
        id
    }

    /// The id the next [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> u16 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_one_and_counts_up() {
        let alloc = WindowAllocator::new();
        assert_eq!(alloc.allocate(), 1);
        assert_eq!(alloc.allocate(), 2);
        assert_eq!(alloc.peek(), 3);
    }

    #[test]
    fn wraps_after_last_id() {
        let alloc = WindowAllocator::new();
        let ids: Vec<u16> = (0..WINDOW_ID_MAX as usize + 2)
            .map(|_| alloc.allocate())
            .collect();
        assert_eq!(ids[WINDOW_ID_MAX as usize - 1], 0xFFE);
        assert_eq!(ids[WINDOW_ID_MAX as usize], 1);
        assert_eq!(ids[WINDOW_ID_MAX as usize + 1], 2);
        assert!(ids.iter().all(|&id| (1..=0xFFE).contains(&id)));
    }

    #[test]
    fn concurrent_allocation_is_unique() {
        let alloc = Arc::new(WindowAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || {
                    let mut ids = Vec::with_capacity(500);
                    for _ in 0..500 {
                        ids.push(alloc.allocate());
                    }
                    ids
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "window {id} issued twice");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
