//! The stream controller: open/close, bounded reads, growth and release.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use pagestream_core::prelude::{
    Error, ReadStatus, Result, StreamConfig, StreamLength, StreamReader,
};
use pagestream_mem::{MemoryBudgetImpl, PagePool};

use crate::cache::PageCache;
use crate::delivery::Delivery;
use crate::page::{FillOutcome, Watermark};

/// Lifecycle of a [`PagedStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Closed,
    /// Open, end-of-stream not seen yet; the cache can still grow.
    Growing,
    /// Open with a known total; the cache can only shrink.
    Fixed,
}

/// What one [`PagedStream::populate_cache`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub requested: usize,
    /// Share of the request the simulated transport delivered.
    pub delivered: usize,
    pub pages_appended: usize,
    pub avail: u64,
    pub total: Option<u64>,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub resident_pages: usize,
    pub resident_bytes: u64,
    pub front_offset: u64,
    pub avail: u64,
    pub total: Option<u64>,
    /// Peak budget usage observed after any page allocation of this stream.
    pub peak_budget_bytes: usize,
}

struct OpenStream<S> {
    source: S,
    cache: PageCache,
    mark: Watermark,
}

/// Fetch-on-demand reader over a sequential byte source.
///
/// Reads never block: a range that has not been fetched yet yields
/// [`ReadStatus::Underflow`] and the caller is expected to call
/// [`PagedStream::populate_cache`] and retry. Access is sequential only;
/// once [`PagedStream::purge_cache`] releases a prefix, reading it again is
/// a [`Error::NonSequentialAccess`] rather than a refetch.
pub struct PagedStream<S = File> {
    config: StreamConfig,
    pool: PagePool,
    delivery: Delivery,
    open: Option<OpenStream<S>>,
}

impl<S: Read> PagedStream<S> {
    /// Create a closed stream with its own page budget of `config.mem_cap_bytes`.
    pub fn new(config: StreamConfig) -> Result<Self> {
        let budget = MemoryBudgetImpl::new(config.mem_cap_bytes);
        Self::with_budget(config, budget)
    }

    /// Create a closed stream whose pages are accounted against `budget`.
    pub fn with_budget(config: StreamConfig, budget: MemoryBudgetImpl) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: PagePool::new(budget, config.page_size),
            delivery: Delivery::from_config(&config),
            config,
            open: None,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn state(&self) -> StreamState {
        match &self.open {
            None => StreamState::Closed,
            Some(open) if open.mark.total.is_some() => StreamState::Fixed,
            Some(_) => StreamState::Growing,
        }
    }

    /// Take ownership of `source` and fetch the first page.
    ///
    /// Fails with [`Error::InvalidArgument`] if the stream is already open.
    /// If the first fill fails the stream stays closed.
    pub fn open_source(&mut self, mut source: S) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::InvalidArgument("stream is already open".into()));
        }

        let mut cache = PageCache::new(self.config.page_size);
        let mut mark = Watermark::default();
        cache.grow(&self.pool, &mut source, &mut mark)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            page_size = self.config.page_size,
            avail = mark.avail,
            total = ?mark.total,
            "stream opened"
        );

        self.open = Some(OpenStream {
            source,
            cache,
            mark,
        });
        Ok(())
    }

    /// Release the source and every cached page. No-op when already closed.
    pub fn close(&mut self) {
        if let Some(mut open) = self.open.take() {
            open.cache.clear();
            #[cfg(feature = "tracing")]
            tracing::debug!(avail = open.mark.avail, "stream closed");
        }
    }

    fn opened(&self) -> Result<&OpenStream<S>> {
        self.open.as_ref().ok_or(Error::NotOpen)
    }

    /// Copy exactly `dst.len()` bytes starting at `pos`, or nothing.
    ///
    /// Checks run in this order: not open, `pos + len` overflowing, `pos`
    /// before the retained front, range past a known total, empty read
    /// (succeeds), range not fetched yet (underflow).
    pub fn read(&self, pos: u64, dst: &mut [u8]) -> Result<ReadStatus> {
        let open = self.opened()?;
        let len = dst.len() as u64;
        let end = pos.checked_add(len).ok_or_else(|| {
            Error::InvalidArgument(format!("read of {len} bytes at {pos} overflows"))
        })?;

        let front = open.cache.front_offset();
        if pos < front {
            return Err(Error::NonSequentialAccess { pos, front });
        }

        if let Some(total) = open.mark.total {
            if pos > total || end > total {
                return Err(Error::BeyondKnownLength { pos, len, total });
            }
        }

        if len == 0 {
            return Ok(ReadStatus::Complete);
        }

        if end > open.mark.avail {
            return Ok(ReadStatus::Underflow);
        }

        let copied = open.cache.copy_out(pos, dst);
        debug_assert_eq!(copied as u64, len, "resident range must copy in full");
        Ok(ReadStatus::Complete)
    }

    pub fn length(&self) -> Result<StreamLength> {
        let open = self.opened()?;
        Ok(StreamLength {
            total: open.mark.total,
            avail: open.mark.avail,
        })
    }

    /// Earliest stream position that can still be read.
    pub fn front_offset(&self) -> Result<u64> {
        Ok(self.opened()?.cache.front_offset())
    }

    /// Simulate one fetch of `requested_len` bytes starting at `pos`.
    ///
    /// Only part of the request arrives: the delivery policy picks
    /// `delivered` in `[1, requested_len]` and whole pages are appended from
    /// the tail until `avail >= pos + delivered`, end-of-stream is reached, or
    /// a fill fails. Pages appended before a failure stay resident.
    pub fn populate_cache(&mut self, pos: u64, requested_len: usize) -> Result<PopulateReport> {
        let open = self.open.as_mut().ok_or(Error::NotOpen)?;
        let front = open.cache.front_offset();
        if pos < front {
            return Err(Error::NonSequentialAccess { pos, front });
        }

        let mut report = PopulateReport {
            requested: requested_len,
            delivered: 0,
            pages_appended: 0,
            avail: open.mark.avail,
            total: open.mark.total,
        };
        if requested_len == 0 {
            return Ok(report);
        }

        report.delivered = self.delivery.deliver(requested_len);
        let end = pos.saturating_add(report.delivered as u64);

        while open.mark.total.is_none() && open.mark.avail < end {
            let growth = open.cache.grow(&self.pool, &mut open.source, &mut open.mark)?;
            if growth.appended {
                report.pages_appended += 1;
            }
            if growth.outcome == FillOutcome::EndOfStream {
                #[cfg(feature = "tracing")]
                tracing::debug!(total = open.mark.avail, "end of stream");
                break;
            }
        }

        report.avail = open.mark.avail;
        report.total = open.mark.total;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pos,
            requested = report.requested,
            delivered = report.delivered,
            pages = report.pages_appended,
            avail = report.avail,
            "cache populated"
        );

        Ok(report)
    }

    /// Release every page lying wholly before the page that holds `pos`.
    ///
    /// A `pos` before the retained front is a no-op. Returns the number of
    /// pages released; released data can never be read again.
    pub fn purge_cache(&mut self, pos: u64) -> Result<usize> {
        let open = self.open.as_mut().ok_or(Error::NotOpen)?;
        if pos < open.cache.front_offset() {
            return Ok(0);
        }
        let released = open.cache.release_before(pos);

        #[cfg(feature = "tracing")]
        if released > 0 {
            tracing::debug!(
                pos,
                released,
                front = open.cache.front_offset(),
                "cache purged"
            );
        }

        Ok(released)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let open = self.opened()?;
        Ok(CacheStats {
            resident_pages: open.cache.len(),
            resident_bytes: open.cache.resident_bytes(),
            front_offset: open.cache.front_offset(),
            avail: open.mark.avail,
            total: open.mark.total,
            peak_budget_bytes: self.pool.peak_bytes(),
        })
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        self.pool.budget()
    }
}

impl PagedStream<File> {
    /// Open the file at `path` read-only and fetch its first page.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::InvalidArgument("stream is already open".into()));
        }
        let file = File::open(path.as_ref())?;
        self.open_source(file)
    }
}

impl<S: Read> StreamReader for PagedStream<S> {
    fn read(&mut self, pos: u64, dst: &mut [u8]) -> Result<ReadStatus> {
        PagedStream::read(self, pos, dst)
    }

    fn length(&self) -> Result<StreamLength> {
        PagedStream::length(self)
    }
}

impl<S> std::fmt::Debug for PagedStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("PagedStream");
        d.field("config", &self.config);
        match &self.open {
            Some(open) => d
                .field("pages", &open.cache.len())
                .field("front", &open.cache.front_offset())
                .field("mark", &open.mark),
            None => d.field("open", &false),
        };
        d.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestream_core::config::DeliveryMode;
    use std::io::Cursor;

    fn full_config(page_size: usize) -> StreamConfig {
        StreamConfig {
            page_size,
            delivery: DeliveryMode::Full,
            ..Default::default()
        }
    }

    fn opened(data: &[u8], page_size: usize) -> PagedStream<Cursor<Vec<u8>>> {
        let mut s = PagedStream::new(full_config(page_size)).unwrap();
        s.open_source(Cursor::new(data.to_vec())).unwrap();
        s
    }

    #[test]
    fn closed_stream_rejects_everything_but_close() {
        let mut s: PagedStream<Cursor<Vec<u8>>> = PagedStream::new(full_config(16)).unwrap();
        assert_eq!(s.state(), StreamState::Closed);
        assert!(matches!(s.read(0, &mut [0u8; 1]), Err(Error::NotOpen)));
        assert!(matches!(s.length(), Err(Error::NotOpen)));
        assert!(matches!(s.populate_cache(0, 10), Err(Error::NotOpen)));
        assert!(matches!(s.purge_cache(0), Err(Error::NotOpen)));
        s.close();
        s.close();
    }

    #[test]
    fn double_open_is_invalid() {
        let mut s = opened(&[1, 2, 3], 16);
        let err = s.open_source(Cursor::new(vec![4])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let mut dst = [0u8; 3];
        assert_eq!(s.read(0, &mut dst).unwrap(), ReadStatus::Complete);
        assert_eq!(dst, [1, 2, 3]);
    }

    #[test]
    fn small_source_is_fixed_after_open() {
        let s = opened(&[9; 10], 16);
        assert_eq!(s.state(), StreamState::Fixed);
        assert_eq!(
            s.length().unwrap(),
            StreamLength {
                total: Some(10),
                avail: 10
            }
        );
    }

    #[test]
    fn zero_length_read_succeeds_up_to_total() {
        let s = opened(&[9; 10], 16);
        assert_eq!(s.read(10, &mut []).unwrap(), ReadStatus::Complete);
        assert!(matches!(
            s.read(11, &mut []),
            Err(Error::BeyondKnownLength { .. })
        ));
    }

    #[test]
    fn overflowing_range_is_invalid_even_after_purge() {
        let data = vec![3u8; 256];
        let mut s = opened(&data, 64);
        s.populate_cache(0, 256).unwrap();
        s.purge_cache(200).unwrap();
        assert_eq!(s.front_offset().unwrap(), 192);

        let err = s.read(u64::MAX - 1, &mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(s.read(0, &mut [0u8; 4]).unwrap_err().is_non_sequential());
    }

    #[test]
    fn full_delivery_reaches_requested_end() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut s = opened(&data, 64);
        let report = s.populate_cache(64, 300).unwrap();
        assert_eq!(report.delivered, 300);
        assert!(report.avail >= 364);
        assert_eq!(report.avail % 64, 0);
        assert_eq!(report.pages_appended, 5);
    }

    #[test]
    fn populate_before_front_is_non_sequential() {
        let data = vec![0u8; 256];
        let mut s = opened(&data, 64);
        s.populate_cache(0, 256).unwrap();
        assert_eq!(s.purge_cache(130).unwrap(), 2);
        assert!(s.populate_cache(10, 5).unwrap_err().is_non_sequential());
        assert_eq!(s.populate_cache(128, 0).unwrap().pages_appended, 0);
    }

    #[test]
    fn budget_exhaustion_keeps_existing_pages() {
        let cfg = StreamConfig {
            page_size: 64,
            mem_cap_bytes: 128,
            delivery: DeliveryMode::Full,
            seed: None,
        };
        let mut s = PagedStream::new(cfg).unwrap();
        s.open_source(Cursor::new(vec![5u8; 1000])).unwrap();

        let err = s.populate_cache(0, 1000).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { .. }));
        assert_eq!(s.length().unwrap().avail, 128);

        assert_eq!(s.purge_cache(64).unwrap(), 1);
        let report = s.populate_cache(64, 100).unwrap();
        assert_eq!(report.avail, 192);
        assert_eq!(s.budget().used_bytes(), 128);
    }

    #[test]
    fn close_returns_budget() {
        let mut s = opened(&[1u8; 500], 64);
        s.populate_cache(0, 500).unwrap();
        assert!(s.budget().used_bytes() > 0);
        s.close();
        assert_eq!(s.budget().used_bytes(), 0);
        assert_eq!(s.state(), StreamState::Closed);
    }
}
