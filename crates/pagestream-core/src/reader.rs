//! The reader capability a container parser is handed.
//!
//! A parser only ever needs two things from its byte source: a bounded read
//! at an absolute position and the current length picture. Everything else
//! (growing the cache, releasing consumed data) belongs to whoever drives
//! the parser.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of a bounded read that did not fail.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Exactly `dst.len()` bytes were copied.
    Complete,
    /// The range is not fetched yet. Nothing was copied; grow the cache and retry.
    Underflow,
}

impl ReadStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, ReadStatus::Complete)
    }

    pub fn is_underflow(self) -> bool {
        matches!(self, ReadStatus::Underflow)
    }
}

/// How much of the stream is known and how much has been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLength {
    /// Stream length, once end-of-stream has been observed.
    pub total: Option<u64>,
    /// Bytes fetched from the source so far.
    pub avail: u64,
}

impl StreamLength {
    /// True once the whole stream has been fetched.
    pub fn is_complete(&self) -> bool {
        self.total == Some(self.avail)
    }
}

/// Bounded random-access reader over a sequentially fetched stream.
pub trait StreamReader {
    /// Copy exactly `dst.len()` bytes starting at `pos` into `dst`, or nothing.
    fn read(&mut self, pos: u64, dst: &mut [u8]) -> Result<ReadStatus>;

    /// Current `(total, avail)` pair.
    fn length(&self) -> Result<StreamLength>;
}

impl<R: StreamReader + ?Sized> StreamReader for &mut R {
    fn read(&mut self, pos: u64, dst: &mut [u8]) -> Result<ReadStatus> {
        (**self).read(pos, dst)
    }

    fn length(&self) -> Result<StreamLength> {
        (**self).length()
    }
}
