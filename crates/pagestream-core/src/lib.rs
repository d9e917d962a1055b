#![forbid(unsafe_code)]
//! pagestream-core: the shared vocabulary of the paged stream simulator.
//!
//! Holds the error taxonomy, the stream configuration, the reader capability
//! handed to a container parser, and the abstract memory budget interfaces.
//! Concrete budgets live in `pagestream-mem`; the page cache and controller
//! live in `pagestream-io`.

pub mod budget;
pub mod config;
pub mod error;
pub mod prelude;
pub mod reader;

pub use error::{Error, Result};
pub use reader::{ReadStatus, StreamLength, StreamReader};
