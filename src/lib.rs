//! pagestream: a simulated network-backed byte stream for container parsers.
//!
//! Facade over the workspace crates:
//! - [`pagestream_core`]: errors, configuration, the [`StreamReader`] capability
//! - [`pagestream_mem`]: the page memory budget and pool
//! - [`pagestream_io`]: pages, the page cache, [`PagedStream`] and the pump helpers

pub use pagestream_core;
pub use pagestream_io;
pub use pagestream_mem;

pub use pagestream_core::config::{DeliveryMode, StreamConfig};
pub use pagestream_core::{Error, ReadStatus, Result, StreamLength, StreamReader};
pub use pagestream_io::{drain, read_exact_at, DrainOptions, DrainSummary, PagedStream};
pub use pagestream_mem::MemoryBudgetImpl;
