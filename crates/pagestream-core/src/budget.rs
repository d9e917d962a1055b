//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `pagestream-mem`. We keep only traits
//! here so any crate can depend on the API without pulling the pool.

/// A guard returned by a memory budget when bytes are acquired.
///
/// The concrete type lives in `pagestream-mem`. It must be RAII (releases on
/// Drop) and `Send`.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;
    /// Optional debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle representing a cap on resident page memory.
///
/// The page cache calls `try_acquire` before allocating a page. If `None` is
/// returned, growth stops and the caller has to purge before fetching more.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget. Returns a guard on success.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Currently used bytes.
    fn used_bytes(&self) -> usize;
}

// NOTE: Do *not* add default impls here that would silently "allow" allocations.
// The mem crate is the only place where guards should be constructed.
