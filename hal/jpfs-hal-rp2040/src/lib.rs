//! RP2040-specific flash glue for the Journaled PicoFS
//!
//! This crate wires the RP2040's on-board QSPI flash into the file store:
//!
//! - Blocking flash driver wrapped as a `jpfs_hal::WordFlash`
//! - Default partition for the two JPFS logs at the end of flash

#![no_std]

pub mod flash;

pub use flash::{mount, new_flash, Rp2040Flash, JPFS_GEOMETRY};
