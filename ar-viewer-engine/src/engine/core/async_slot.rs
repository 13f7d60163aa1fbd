use std::sync::{Arc, Mutex};

/// Single-assignment cell bridging a promise-driven task and the frame loop.
///
/// The producer (a `spawn_local` future on wasm, or a test) calls `fill` once;
/// systems call `take` every frame until a value shows up. Cloning shares the
/// same cell.
#[derive(Debug)]
pub struct AsyncSlot<T> {
    cell: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for AsyncSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for AsyncSlot<T> {
    fn default() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> AsyncSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that is already resolved, for synchronous answers.
    pub fn ready(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Store the result. A second fill overwrites an untaken value.
    pub fn fill(&self, value: T) {
        if let Ok(mut cell) = self.cell.lock() {
            *cell = Some(value);
        }
    }

    /// Remove the result if it has arrived.
    pub fn take(&self) -> Option<T> {
        self.cell.lock().ok().and_then(|mut cell| cell.take())
    }

    pub fn is_ready(&self) -> bool {
        self.cell.lock().map(|cell| cell.is_some()).unwrap_or(false)
    }

    /// Whether `other` refers to the same cell.
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_cell() {
        let slot = AsyncSlot::new();
        let producer = slot.clone();
        assert!(!slot.is_ready());

        producer.fill(7u32);
        assert!(slot.is_ready());
        assert_eq!(slot.take(), Some(7));
        assert_eq!(producer.take(), None);
    }

    #[test]
    fn ready_slot_resolves_immediately() {
        let slot = AsyncSlot::ready("done");
        assert!(slot.same_slot(&slot.clone()));
        assert_eq!(slot.take(), Some("done"));
    }
}
