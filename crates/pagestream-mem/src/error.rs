use thiserror::Error;

/// Result type local to pagestream-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("zero-sized page requested (tag '{tag}')")]
    ZeroSized { tag: &'static str },
}

impl From<Error> for pagestream_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::BudgetExceeded {
                requested,
                capacity,
                used,
                ..
            } => pagestream_core::Error::BudgetExceeded {
                requested,
                capacity,
                used,
            },
            Error::ZeroSized { tag } => pagestream_core::Error::InvalidArgument(format!(
                "zero-sized page requested (tag '{tag}')"
            )),
        }
    }
}
