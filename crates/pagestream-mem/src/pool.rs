//! Fallible page buffer pool built on top of the hard MemoryBudget.
//!
//! All cache page buffers are acquired here to guarantee budget adherence.

use std::ops::{Deref, DerefMut};

use pagestream_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};
use crate::guard::{BudgetGuardImpl, MemoryBudgetImpl};
use crate::tracking::PeakTracker;

const PAGE_TAG: &str = "page";

/// Fixed-capacity zeroed buffer that returns its accounted bytes on drop.
pub struct PageBuf {
    guard: BudgetGuardImpl,
    buf: Box<[u8]>,
}

impl PageBuf {
    /// Allocate a zeroed buffer of `len` bytes, accounting against `budget`.
    pub fn new_zeroed(
        budget: &impl MemoryBudget<Guard = BudgetGuardImpl>,
        len: usize,
        tag: &'static str,
    ) -> Result<Self> {
        if len == 0 {
            return Err(Error::ZeroSized { tag });
        }
        let guard = budget
            .try_acquire(len, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: len,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;

        Ok(Self {
            guard,
            buf: vec![0u8; len].into_boxed_slice(),
        })
    }

    /// Bytes accounted against the budget for this buffer.
    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Deref for PageBuf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PageBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl std::fmt::Debug for PageBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuf")
            .field("capacity", &self.buf.len())
            .finish()
    }
}

/// Hands out equally sized page buffers against one budget and records the
/// peak resident byte count.
pub struct PagePool {
    budget: MemoryBudgetImpl,
    page_size: usize,
    peak: PeakTracker,
}

impl PagePool {
    pub fn new(budget: MemoryBudgetImpl, page_size: usize) -> Self {
        Self {
            budget,
            page_size,
            peak: PeakTracker::new(),
        }
    }

    /// Allocate one zeroed page.
    pub fn alloc_page(&self) -> Result<PageBuf> {
        let page = PageBuf::new_zeroed(&self.budget, self.page_size, PAGE_TAG)?;
        self.peak.record_used(self.budget.used_bytes());
        Ok(page)
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    /// Highest budget usage observed right after a page allocation.
    pub fn peak_bytes(&self) -> usize {
        self.peak.peak()
    }
}

impl std::fmt::Debug for PagePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePool")
            .field("page_size", &self.page_size)
            .field("budget", &self.budget)
            .field("peak", &self.peak.peak())
            .finish()
    }
}
