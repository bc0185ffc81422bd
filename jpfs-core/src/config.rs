//! Log layout configuration
//!
//! A JPFS partition is two equally sized, page-aligned logs. Board crates
//! describe theirs with a [`Geometry`] constant; it is validated against
//! the medium's erase page size when the file store is mounted.

use crate::block::BLOCK_SIZE;

/// Placement of the two logs on the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Byte address of log A (preferred at mount)
    pub log_a: u32,
    /// Byte address of log B
    pub log_b: u32,
    /// Size of each log in bytes
    pub size: u32,
}

/// Reasons a [`Geometry`] cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeometryError {
    /// Log size or address not a multiple of the block or page size
    Misaligned,
    /// Log cannot hold the marker block and at least one more
    TooSmall,
    /// The two logs share bytes
    Overlap,
}

impl Geometry {
    pub const fn new(log_a: u32, log_b: u32, size: u32) -> Self {
        Self { log_a, log_b, size }
    }

    /// Number of blocks per log
    pub const fn blocks(&self) -> u32 {
        self.size / BLOCK_SIZE
    }

    /// Check the layout against the medium's erase page size
    pub fn validate(&self, page_size: u32) -> Result<(), GeometryError> {
        if self.size < 2 * BLOCK_SIZE {
            return Err(GeometryError::TooSmall);
        }
        if page_size == 0 || self.size % BLOCK_SIZE != 0 || self.size % page_size != 0 {
            return Err(GeometryError::Misaligned);
        }
        if self.log_a % page_size != 0 || self.log_b % page_size != 0 {
            return Err(GeometryError::Misaligned);
        }

        let (a, b, size) = (
            u64::from(self.log_a),
            u64::from(self.log_b),
            u64::from(self.size),
        );
        if a < b + size && b < a + size {
            return Err(GeometryError::Overlap);
        }
        Ok(())
    }
}
