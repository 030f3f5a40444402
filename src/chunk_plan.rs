//! Byte-range planning for upload sessions
//!
//! A plan is a pure function of the file size and the chunk size. It yields
//! the ranges in strictly increasing byte order; the remote session only
//! accepts ranges in that order.

use std::fmt;
use std::num::NonZeroU64;

/// One contiguous range of a file, sent in a single chunk PUT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub start: u64,
    /// Inclusive, as in the `Content-Range` header
    pub end: u64,
    pub is_final: bool,
}

impl ChunkRange {
    /// Number of bytes covered by this range (never zero)
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a file of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Lazy sequence of [`ChunkRange`]s for one file
///
/// Cloning a plan (or calling [`ChunkPlan::restart`]) yields the same ranges
/// again from index 0.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
    full_chunks: u64,
    leftover: u64,
    next_index: u64,
}

impl ChunkPlan {
    pub fn new(file_size: u64, chunk_size: NonZeroU64) -> Self {
        let chunk_size = chunk_size.get();
        let full_chunks = file_size / chunk_size;
        let leftover = file_size - chunk_size * full_chunks;
        Self {
            file_size,
            chunk_size,
            full_chunks,
            leftover,
            next_index: 0,
        }
    }

    /// Total number of ranges, `ceil(file_size / chunk_size)`
    pub fn chunk_count(&self) -> u64 {
        self.full_chunks + u64::from(self.leftover > 0)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// A fresh plan over the same file, positioned at index 0
    pub fn restart(&self) -> Self {
        Self {
            next_index: 0,
            ..self.clone()
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let count = self.chunk_count();
        if self.next_index >= count {
            return None;
        }

        let index = self.next_index;
        let start = index * self.chunk_size;
        // index == full_chunks only happens when leftover > 0: the short tail
        let end = if index == self.full_chunks {
            start + self.leftover - 1
        } else {
            start + self.chunk_size - 1
        };

        self.next_index += 1;
        Some(ChunkRange {
            index,
            start,
            end,
            is_final: index + 1 == count,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.chunk_count() - self.next_index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}

/// Plan the byte ranges for a file of `file_size` bytes
pub fn plan(file_size: u64, chunk_size: NonZeroU64) -> ChunkPlan {
    ChunkPlan::new(file_size, chunk_size)
}
