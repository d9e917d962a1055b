use thiserror::Error;

/// Canonical result for every pagestream crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the stream controller and its helpers.
///
/// Running out of fetched data is not listed here: that is
/// [`ReadStatus::Underflow`](crate::reader::ReadStatus::Underflow), a
/// flow-control signal the caller answers by growing the cache.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("stream is not open")]
    NotOpen,

    #[error("non-sequential access: position {pos} precedes retained offset {front}")]
    NonSequentialAccess { pos: u64, front: u64 },

    #[error("range {pos}+{len} exceeds stream length {total}")]
    BeyondKnownLength { pos: u64, len: u64, total: u64 },

    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("page budget exceeded: requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("read of {len} bytes at {pos} still underflowing after {rounds} fetch rounds")]
    Stalled { pos: u64, len: u64, rounds: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by touching data that was already purged.
    pub fn is_non_sequential(&self) -> bool {
        matches!(self, Error::NonSequentialAccess { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
