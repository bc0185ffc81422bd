//! JPFS Hardware Abstraction Layer
//!
//! This crate defines the word-granular flash contract that the Journaled
//! PicoFS consumes. Chip-specific crates implement it for their NOR flash or
//! EEPROM, so the same file store runs unchanged on every board.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  jpfs-core (log, scanner, writer)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  jpfs-hal (this crate - WordFlash)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ NorFlashWords │       │   SimFlash    │
//! │ (rp2040, ...) │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::WordFlash`] - Blocking, word-aligned read/write/erase
//!
//! # Features
//!
//! - `sim` - In-memory [`SimFlash`](sim::SimFlash) for host tests
//! - `defmt` - Enable debug formatting support

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod nor;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export key types at crate root for convenience
pub use flash::{BitDefault, FlashError, WordFlash, WORD_SIZE};
pub use nor::NorFlashWords;
#[cfg(any(test, feature = "sim"))]
pub use sim::SimFlash;
