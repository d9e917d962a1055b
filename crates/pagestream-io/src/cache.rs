//! Offset-ordered run of pages covering `[front_offset, avail)`.
//!
//! Pages sit in a `VecDeque` sorted by offset with no gaps, so the page
//! holding a position is found by binary search and purging is a pop from
//! the front.

use std::collections::VecDeque;
use std::io::Read;

use pagestream_core::Result;
use pagestream_mem::PagePool;

use crate::page::{FillOutcome, Page, Watermark};

/// Result of one growth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Growth {
    pub outcome: FillOutcome,
    /// Whether a new page was appended (as opposed to topping up the tail).
    pub appended: bool,
}

#[derive(Debug)]
pub struct PageCache {
    pages: VecDeque<Page>,
    page_size: usize,
}

impl PageCache {
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: VecDeque::new(),
            page_size,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pages.len()
    }

    #[cfg(test)]
    fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    /// Earliest retained stream position.
    pub fn front_offset(&self) -> u64 {
        self.pages.front().map_or(0, Page::offset)
    }

    /// Offset the next appended page starts at.
    pub fn next_offset(&self) -> u64 {
        self.pages
            .back()
            .map_or(0, |tail| tail.offset() + self.page_size as u64)
    }

    /// Valid stream bytes currently held.
    pub fn resident_bytes(&self) -> u64 {
        self.pages.iter().map(|p| p.len() as u64).sum()
    }

    /// Index of the page whose range starts at or before `pos`.
    pub fn locate(&self, pos: u64) -> Option<usize> {
        self.pages
            .partition_point(|p| p.offset() <= pos)
            .checked_sub(1)
    }

    /// Fetch more data into the tail.
    ///
    /// Tops up the tail page if an earlier fill stopped short on an error,
    /// otherwise appends a fresh page at [`PageCache::next_offset`].
    pub fn grow<R: Read + ?Sized>(
        &mut self,
        pool: &PagePool,
        source: &mut R,
        mark: &mut Watermark,
    ) -> Result<Growth> {
        if let Some(tail) = self.pages.back_mut() {
            if !tail.is_full() {
                let outcome = tail.fill(source, mark)?;
                return Ok(Growth {
                    outcome,
                    appended: false,
                });
            }
        }

        let mut page = Page::new(self.next_offset(), pool.alloc_page()?);
        let filled = page.fill(source, mark);
        // Keep whatever was read even if the fill failed half way.
        self.pages.push_back(page);
        Ok(Growth {
            outcome: filled?,
            appended: true,
        })
    }

    /// Copy `dst.len()` bytes starting at `pos` out of resident pages.
    ///
    /// Returns the number of bytes copied, which is short only if the range
    /// is not fully resident.
    pub fn copy_out(&self, pos: u64, dst: &mut [u8]) -> usize {
        let Some(mut idx) = self.locate(pos) else {
            return 0;
        };

        let mut pos = pos;
        let mut copied = 0;
        while copied < dst.len() {
            let Some(page) = self.pages.get(idx) else {
                break;
            };
            let data = page.data();
            let start = (pos - page.offset()) as usize;
            if start >= data.len() {
                break;
            }
            let n = (data.len() - start).min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&data[start..start + n]);
            copied += n;
            pos += n as u64;
            idx += 1;
        }
        copied
    }

    /// Drop every page lying wholly before the page that holds `pos`.
    ///
    /// The page holding `pos` (or the tail, if `pos` is past it) is kept.
    /// Returns the number of pages released.
    pub fn release_before(&mut self, pos: u64) -> usize {
        let Some(keep) = self.locate(pos) else {
            return 0;
        };
        self.pages.drain(..keep);
        keep
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
