//! Driver-side loops over the probe/fetch/release contract.
//!
//! A parser talking to [`PagedStream`] sees underflows; somebody has to turn
//! them into fetches. These helpers are that somebody for callers that do not
//! need to interleave anything else between rounds.

use std::io::Read;

use serde::Serialize;

use pagestream_core::{Error, ReadStatus, Result};

use crate::stream::PagedStream;

/// Fetch rounds allowed for a single read before giving up.
pub const DEFAULT_MAX_ROUNDS: usize = 1 << 20;

/// Read exactly `dst.len()` bytes at `pos`, fetching `request_len` bytes per
/// round on underflow.
///
/// Every round asks for data starting at the current high-water mark, so each
/// fetch appends at least one page until end-of-stream. Returns the number of
/// fetch rounds it took.
pub fn read_exact_at<S: Read>(
    stream: &mut PagedStream<S>,
    pos: u64,
    dst: &mut [u8],
    request_len: usize,
    max_rounds: usize,
) -> Result<usize> {
    let request_len = request_len.max(1);
    let mut rounds = 0;
    loop {
        if stream.read(pos, dst)? == ReadStatus::Complete {
            return Ok(rounds);
        }
        if rounds == max_rounds {
            return Err(Error::Stalled {
                pos,
                len: dst.len() as u64,
                rounds,
            });
        }
        let avail = stream.length()?.avail;
        stream.populate_cache(avail, request_len)?;
        rounds += 1;
    }
}

#[derive(Debug, Clone)]
pub struct DrainOptions {
    /// Bytes handed to the sink per read.
    pub chunk_len: usize,
    /// Bytes requested per fetch round.
    pub request_len: usize,
    /// Release consumed pages after every chunk.
    pub purge_behind: bool,
    /// Consecutive underflowing rounds tolerated for one chunk.
    pub max_rounds: usize,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            chunk_len: 4096,
            request_len: 8192,
            purge_behind: true,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Counters from a [`drain`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub bytes: u64,
    pub chunks: u64,
    pub fetch_rounds: u64,
    pub underflows: u64,
    pub pages_purged: u64,
    pub peak_budget_bytes: usize,
    pub total: Option<u64>,
}

/// Stream everything from the retained front to end-of-stream into `sink`.
pub fn drain<S, F>(
    stream: &mut PagedStream<S>,
    opts: &DrainOptions,
    mut sink: F,
) -> Result<DrainSummary>
where
    S: Read,
    F: FnMut(&[u8]),
{
    if opts.chunk_len == 0 {
        return Err(Error::InvalidArgument("chunk_len must be non-zero".into()));
    }

    let mut summary = DrainSummary::default();
    let mut buf = vec![0u8; opts.chunk_len];
    let mut pos = stream.front_offset()?;
    let mut stalled = 0usize;

    loop {
        let length = stream.length()?;
        let want = match length.total {
            Some(total) if pos >= total => break,
            Some(total) => opts.chunk_len.min((total - pos) as usize),
            None => opts.chunk_len,
        };

        match stream.read(pos, &mut buf[..want])? {
            ReadStatus::Complete => {
                sink(&buf[..want]);
                pos += want as u64;
                summary.bytes += want as u64;
                summary.chunks += 1;
                stalled = 0;
                if opts.purge_behind {
                    summary.pages_purged += stream.purge_cache(pos)? as u64;
                }
            }
            ReadStatus::Underflow => {
                summary.underflows += 1;
                if stalled == opts.max_rounds {
                    return Err(Error::Stalled {
                        pos,
                        len: want as u64,
                        rounds: stalled,
                    });
                }
                stream.populate_cache(length.avail, opts.request_len.max(1))?;
                summary.fetch_rounds += 1;
                stalled += 1;
            }
        }
    }

    let stats = stream.stats()?;
    summary.peak_budget_bytes = stats.peak_budget_bytes;
    summary.total = stats.total;

    #[cfg(feature = "tracing")]
    tracing::info!(
        bytes = summary.bytes,
        chunks = summary.chunks,
        fetch_rounds = summary.fetch_rounds,
        pages_purged = summary.pages_purged,
        "stream drained"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestream_core::config::{DeliveryMode, StreamConfig};
    use std::io::Cursor;

    fn stream(data: &[u8], page_size: usize, seed: u64) -> PagedStream<Cursor<Vec<u8>>> {
        let cfg = StreamConfig {
            page_size,
            delivery: DeliveryMode::Random,
            seed: Some(seed),
            ..Default::default()
        };
        let mut s = PagedStream::new(cfg).unwrap();
        s.open_source(Cursor::new(data.to_vec())).unwrap();
        s
    }

    #[test]
    fn read_exact_at_fetches_until_resident() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut s = stream(&data, 128, 1);
        let mut dst = vec![0u8; 900];
        let rounds = read_exact_at(&mut s, 3000, &mut dst, 64, 10_000).unwrap();
        assert!(rounds > 0);
        assert_eq!(&dst[..], &data[3000..3900]);
    }

    #[test]
    fn read_exact_at_past_end_fails_once_total_known() {
        let data = vec![1u8; 300];
        let mut s = stream(&data, 128, 2);
        let mut dst = vec![0u8; 100];
        let err = read_exact_at(&mut s, 250, &mut dst, 1000, 10_000).unwrap_err();
        assert!(matches!(err, Error::BeyondKnownLength { total: 300, .. }));
    }

    #[test]
    fn read_exact_at_reports_stall() {
        let data = vec![1u8; 10_000];
        let mut s = stream(&data, 128, 3);
        let mut dst = vec![0u8; 100];
        let err = read_exact_at(&mut s, 9000, &mut dst, 1, 2).unwrap_err();
        assert!(matches!(err, Error::Stalled { rounds: 2, .. }));
    }

    #[test]
    fn drain_reproduces_source_and_bounds_residency() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut s = stream(&data, 256, 4);
        let mut out = Vec::new();
        let opts = DrainOptions {
            chunk_len: 1000,
            request_len: 700,
            ..Default::default()
        };
        let summary = drain(&mut s, &opts, |chunk| out.extend_from_slice(chunk)).unwrap();

        assert_eq!(out, data);
        assert_eq!(summary.bytes, 20_000);
        assert_eq!(summary.total, Some(20_000));
        assert!(summary.pages_purged > 0);
        assert!(summary.peak_budget_bytes < 20_000);
        assert!(s.stats().unwrap().resident_pages <= 2);
    }

    #[test]
    fn drain_without_purge_keeps_everything() {
        let data = vec![3u8; 2048];
        let mut s = stream(&data, 256, 5);
        let opts = DrainOptions {
            purge_behind: false,
            ..Default::default()
        };
        let summary = drain(&mut s, &opts, |_| {}).unwrap();
        assert_eq!(summary.pages_purged, 0);
        assert_eq!(s.front_offset().unwrap(), 0);
        let mut dst = [0u8; 16];
        assert_eq!(s.read(0, &mut dst).unwrap(), ReadStatus::Complete);
    }

    #[test]
    fn drain_of_empty_source() {
        let mut s = stream(&[], 64, 6);
        let summary = drain(&mut s, &DrainOptions::default(), |_| panic!("no data")).unwrap();
        assert_eq!(summary.bytes, 0);
        assert_eq!(summary.total, Some(0));
    }
}
