//! Journaled PicoFS (JPFS)
//!
//! A flat, log-structured file store that lives directly on raw NOR flash
//! or EEPROM words. Files are named by a 12-byte UFID, hold at most 504
//! bytes, and at most 64 of them exist at a time.
//!
//! - Block codec for entry, data-start and data-continuation blocks
//! - Raw log accessor issuing 8-word block reads, appends and taints
//! - Scanner resolving entries and "latest valid chain wins"
//! - Writer appending CRC-protected block chains
//! - Log manager with two ping-pong logs and compaction
//!
//! # Crash consistency
//!
//! Blocks are only ever appended to the active log. A chain becomes
//! visible once its final CRC word is written, so a write interrupted by
//! power loss leaves a chain that fails validation and is ignored; the
//! previous content of the file stays authoritative. Removal and
//! supersession flip tag bits toward the programmed state, which needs no
//! erase.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod block;
pub mod config;
pub mod error;
mod log;
pub mod manager;
mod read;
mod scan;
mod value;
mod write;

#[cfg(test)]
mod testutil;

pub use block::{FileId, Ufid, MAX_FILES, MAX_FILE_SIZE, UFID_LEN};
pub use config::{Geometry, GeometryError};
pub use error::JpfsError;
pub use log::LogIndex;
pub use manager::{Jpfs, LogStats};
