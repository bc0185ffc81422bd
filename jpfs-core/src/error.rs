//! File store errors
//!
//! Only capacity and lookup failures are reported. Corrupt or half-written
//! blocks are never an error: scanning treats them as absent.

use jpfs_hal::FlashError;

use crate::config::GeometryError;

/// Errors from file store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JpfsError {
    /// Payload exceeds the maximum file size
    TooLarge,
    /// Not enough free blocks, even after compaction
    NoSpace,
    /// All 64 file ids are in use
    NoFileIds,
    /// No file with a valid chain exists for the UFID
    NotFound,
    /// Log layout rejected at mount
    Geometry(GeometryError),
    /// Underlying medium failed
    Flash(FlashError),
    /// Typed value could not be (de)serialized
    Encoding,
}

impl From<FlashError> for JpfsError {
    fn from(err: FlashError) -> Self {
        JpfsError::Flash(err)
    }
}

impl From<GeometryError> for JpfsError {
    fn from(err: GeometryError) -> Self {
        JpfsError::Geometry(err)
    }
}
