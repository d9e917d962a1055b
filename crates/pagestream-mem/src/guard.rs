//! MemoryBudget + RAII guard implementations.
//!
//! Page buffers must *always* hold a guard. Dropping the guard returns the
//! bytes to the budget, which is how a purge frees room for further growth.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagestream_core::budget::{BudgetGuard, MemoryBudget};

struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
}

impl BudgetInner {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self, bytes: usize) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Hard cap on resident page bytes. Cloning shares the same counter, so one
/// budget can bound several streams at once.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner::new(capacity_bytes)),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    /// Bytes that can still be acquired.
    pub fn remaining_bytes(&self) -> usize {
        self.capacity_bytes().saturating_sub(self.used_bytes())
    }
}

impl std::fmt::Debug for MemoryBudgetImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBudgetImpl")
            .field("capacity", &self.capacity_bytes())
            .field("used", &self.used_bytes())
            .finish()
    }
}

/// RAII guard that accounts for a number of bytes.
/// Dropping it returns bytes to the budget.
pub struct BudgetGuardImpl {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.release(self.bytes);
            // NOTE: do not log here to keep drop path fast.
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.inner.try_acquire(bytes) {
            return None;
        }
        Some(BudgetGuardImpl {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_round_trip() {
        let budget = MemoryBudgetImpl::new(4096);
        let guard = budget.try_acquire(1024, "page").expect("fits");
        assert_eq!(budget.used_bytes(), 1024);
        assert_eq!(budget.remaining_bytes(), 3072);
        assert_eq!(guard.tag(), "page");
        drop(guard);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn refuses_past_capacity() {
        let budget = MemoryBudgetImpl::new(2048);
        let _a = budget.try_acquire(1024, "page").expect("first");
        let _b = budget.try_acquire(1024, "page").expect("second");
        assert!(budget.try_acquire(1, "page").is_none());
        assert_eq!(budget.used_bytes(), 2048);
    }

    #[test]
    fn clones_share_the_counter() {
        let budget = MemoryBudgetImpl::new(2048);
        let other = budget.clone();
        let _g = other.try_acquire(2048, "page").expect("fits");
        assert_eq!(budget.used_bytes(), 2048);
        assert!(budget.try_acquire(1, "page").is_none());
    }
}
