//! Convenient re-exports for downstream crates.

pub use crate::budget::{BudgetGuard, MemoryBudget};
pub use crate::config::{DeliveryMode, StreamConfig};
pub use crate::error::{Error, Result};
pub use crate::reader::{ReadStatus, StreamLength, StreamReader};
