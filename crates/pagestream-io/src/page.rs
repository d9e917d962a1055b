//! A single cache page and the fetch high-water mark it advances.

use std::io::{ErrorKind, Read};

use pagestream_core::Result;
use pagestream_mem::PageBuf;

/// Fetch progress of an open stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    /// Bytes pulled from the source so far.
    pub avail: u64,
    /// Stream length, fixed the moment a fill hits end-of-stream.
    pub total: Option<u64>,
}

/// What a fill observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// The page is full; the source may have more.
    Complete,
    /// The source ran dry while filling this page.
    EndOfStream,
}

/// Fixed-capacity chunk of the stream starting at `offset`.
///
/// Only the first `len` bytes are stream data. A page is short only when it
/// was being filled as end-of-stream (or a source error) was hit.
#[derive(Debug)]
pub struct Page {
    offset: u64,
    buf: PageBuf,
    len: usize,
}

impl Page {
    pub fn new(offset: u64, buf: PageBuf) -> Self {
        Self {
            offset,
            buf,
            len: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.capacity()
    }

    /// One past the last valid stream position in this page.
    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Pull bytes from `source` until the page is full or the source is exhausted.
    ///
    /// The source is positioned at `mark.avail`, which must be the first
    /// unfilled position of this page. Every byte read advances `mark.avail`;
    /// a zero-length read fixes `mark.total`. On an I/O error the bytes read
    /// so far stay in the page and a later fill resumes after them.
    pub fn fill<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        mark: &mut Watermark,
    ) -> Result<FillOutcome> {
        debug_assert!(mark.total.is_none());
        debug_assert_eq!(self.end(), mark.avail);

        while !self.is_full() {
            match source.read(&mut self.buf[self.len..]) {
                Ok(0) => {
                    mark.total = Some(mark.avail);
                    return Ok(FillOutcome::EndOfStream);
                }
                Ok(n) => {
                    self.len += n;
                    mark.avail += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(offset = self.offset, avail = mark.avail, "page filled");

        Ok(FillOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestream_core::Error;
    use pagestream_mem::{MemoryBudgetImpl, PagePool};
    use std::io::{self, Cursor};

    fn pool(page_size: usize) -> PagePool {
        PagePool::new(MemoryBudgetImpl::new(1 << 20), page_size)
    }

    /// Yields `limit` bytes, then fails every read.
    struct Flaky {
        inner: Cursor<Vec<u8>>,
        limit: usize,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "link down"));
            }
            let n = buf.len().min(self.limit);
            let n = self.inner.read(&mut buf[..n])?;
            self.limit -= n;
            Ok(n)
        }
    }

    #[test]
    fn full_page_advances_mark() {
        let pool = pool(16);
        let mut src = Cursor::new((0u8..40).collect::<Vec<_>>());
        let mut mark = Watermark::default();
        let mut page = Page::new(0, pool.alloc_page().unwrap());

        assert_eq!(page.fill(&mut src, &mut mark).unwrap(), FillOutcome::Complete);
        assert_eq!(mark.avail, 16);
        assert_eq!(mark.total, None);
        assert_eq!(page.data(), &(0u8..16).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn short_page_fixes_total() {
        let pool = pool(16);
        let mut src = Cursor::new(vec![7u8; 5]);
        let mut mark = Watermark::default();
        let mut page = Page::new(0, pool.alloc_page().unwrap());

        assert_eq!(
            page.fill(&mut src, &mut mark).unwrap(),
            FillOutcome::EndOfStream
        );
        assert_eq!(mark.avail, 5);
        assert_eq!(mark.total, Some(5));
        assert_eq!(page.len(), 5);
        assert!(!page.is_full());
    }

    #[test]
    fn io_error_keeps_partial_bytes() {
        let pool = pool(16);
        let mut src = Flaky {
            inner: Cursor::new((0u8..32).collect()),
            limit: 10,
        };
        let mut mark = Watermark::default();
        let mut page = Page::new(0, pool.alloc_page().unwrap());

        let err = page.fill(&mut src, &mut mark).unwrap_err();
        assert!(matches!(err, Error::IoFailure(_)));
        assert_eq!(page.len(), 10);
        assert_eq!(mark.avail, 10);
        assert_eq!(mark.total, None);

        src.limit = usize::MAX;
        assert_eq!(page.fill(&mut src, &mut mark).unwrap(), FillOutcome::Complete);
        assert_eq!(page.data(), &(0u8..16).collect::<Vec<_>>()[..]);
    }
}
