#![forbid(unsafe_code)]
//! pagestream-io: the paged cache and the stream controller.
//!
//! [`PagedStream`] emulates a network-backed byte source over a local reader.
//! A parser probes it with bounded reads, which answer
//! [`ReadStatus::Underflow`](pagestream_core::ReadStatus::Underflow) instead of
//! blocking when data is missing. The driver then grows the cache with
//! [`PagedStream::populate_cache`], which delivers a random share of the
//! request the way a single network read would, and releases consumed data
//! with [`PagedStream::purge_cache`].
//!
//! The [`pump`] module carries the driver side of that loop for callers that
//! just want bytes.

pub mod cache;
pub mod delivery;
pub mod page;
pub mod pump;
pub mod stream;

pub use cache::PageCache;
pub use delivery::Delivery;
pub use page::{FillOutcome, Page, Watermark};
pub use pump::{drain, read_exact_at, DrainOptions, DrainSummary};
pub use stream::{CacheStats, PagedStream, PopulateReport, StreamState};
