//! Single-binding exclusivity of populations and domains.
//!
//! Every experiment handle draws a process-unique owner token. An owner
//! slot holds the token of the experiment it is attached to, or zero.

use std::sync::atomic::{AtomicU64, Ordering};

/// Draw a fresh owner token (never zero).
pub(crate) fn next_owner() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// The experiment an instance is attached to.
#[derive(Debug, Default)]
pub(crate) struct OwnerSlot(AtomicU64);

impl OwnerSlot {
    /// Claim the slot for `owner`. Succeeds if free or already held by `owner`.
    pub(crate) fn acquire(&self, owner: u64) -> bool {
        match self
            .0
            .compare_exchange(0, owner, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == owner,
        }
    }

    /// Release the slot if `owner` holds it.
    pub(crate) fn release(&self, owner: u64) {
        let _ = self
            .0
            .compare_exchange(owner, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Whether any experiment holds the slot.
    pub(crate) fn is_bound(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_exclusive_until_released() {
        let slot = OwnerSlot::default();
        let (a, b) = (next_owner(), next_owner());
        assert_ne!(a, b);

        assert!(slot.acquire(a));
        assert!(slot.acquire(a));
        assert!(!slot.acquire(b));

        slot.release(b);
        assert!(slot.is_bound());
        slot.release(a);
        assert!(!slot.is_bound());
        assert!(slot.acquire(b));
    }
}
