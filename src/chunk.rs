//! Sequential chunking of a linear pixel range for buffered bulk transfers.
use crate::{Error, Result};

/// Largest chunk [`ChunkStepper::new`] yields.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// One piece of a chunked range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Offset of the first element.
    pub base: u64,
    /// Number of elements.
    pub size: usize,
}

impl Chunk {
    pub fn end(&self) -> u64 {
        self.base + self.size as u64
    }
}

/// Steps through `0..length` in consecutive chunks, all of the maximum size except
/// possibly the last.
///
/// ```
/// use nd_access::{Chunk, ChunkStepper};
///
/// let chunks: Vec<_> = ChunkStepper::with_chunk_size(10, 4).unwrap().collect();
/// assert_eq!(chunks.last(), Some(&Chunk { base: 8, size: 2 }));
/// ```
#[derive(Debug, Clone)]
pub struct ChunkStepper {
    length: u64,
    chunk_size: usize,
    base: u64,
}

impl ChunkStepper {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            chunk_size: DEFAULT_CHUNK_SIZE,
            base: 0,
        }
    }

    /// Fails if `chunk_size` is zero.
    pub fn with_chunk_size(length: u64, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid("chunk size must be positive"));
        }
        Ok(Self {
            length,
            chunk_size,
            base: 0,
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// The size of the largest chunk which will be yielded;
    /// buffers of this length can hold any chunk.
    pub fn max_chunk_size(&self) -> usize {
        usize::try_from(self.length).map_or(self.chunk_size, |len| len.min(self.chunk_size))
    }
}

impl Iterator for ChunkStepper {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.base >= self.length {
            return None;
        }
        let left = self.length - self.base;
        let size = usize::try_from(left).map_or(self.chunk_size, |l| l.min(self.chunk_size));
        let chunk = Chunk {
            base: self.base,
            size,
        };
        self.base += size as u64;
        Some(chunk)
    }
}

impl std::iter::FusedIterator for ChunkStepper {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::RandomChunkStepper;

    #[test]
    fn test_exact_multiple() {
        let chunks: Vec<_> = ChunkStepper::with_chunk_size(12, 4).unwrap().collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.size == 4));
        assert_eq!(chunks[2].base, 8);
    }

    #[test]
    fn test_default_size() {
        let length = DEFAULT_CHUNK_SIZE as u64 * 2 + 5;
        let stepper = ChunkStepper::new(length);
        assert_eq!(stepper.max_chunk_size(), DEFAULT_CHUNK_SIZE);
        let sizes: Vec<_> = stepper.map(|c| c.size).collect();
        assert_eq!(sizes, vec![DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_SIZE, 5]);
    }

    #[test]
    fn test_short_and_empty() {
        let stepper = ChunkStepper::new(3);
        assert_eq!(stepper.max_chunk_size(), 3);
        assert_eq!(stepper.collect::<Vec<_>>(), vec![Chunk { base: 0, size: 3 }]);
        assert_eq!(ChunkStepper::new(0).count(), 0);
        assert!(ChunkStepper::with_chunk_size(5, 0).is_err());
    }

    #[test]
    fn test_random_chunks_cover_range() {
        let mut expected = 0;
        for chunk in RandomChunkStepper::new(1000, 37) {
            assert_eq!(chunk.base, expected);
            assert!(chunk.size >= 1 && chunk.size <= 37);
            expected = chunk.end();
        }
        assert_eq!(expected, 1000);
    }
}
