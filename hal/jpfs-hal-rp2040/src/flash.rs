//! Flash storage driver for RP2040
//!
//! Places the two JPFS logs in the last 8KB of flash, one 4KB erase sector
//! each, and drives them through embassy-rp's blocking flash API.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use jpfs_core::{Geometry, Jpfs, JpfsError};
use jpfs_hal::{FlashError, NorFlashWords};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const JPFS_LOG_SIZE: u32 = ERASE_SIZE as u32;
pub const JPFS_PARTITION_SIZE: u32 = 2 * JPFS_LOG_SIZE;
pub const JPFS_PARTITION_START: u32 = FLASH_SIZE as u32 - JPFS_PARTITION_SIZE;

/// Log layout for the JPFS partition
pub const JPFS_GEOMETRY: Geometry = Geometry::new(
    JPFS_PARTITION_START,
    JPFS_PARTITION_START + JPFS_LOG_SIZE,
    JPFS_LOG_SIZE,
);

/// Blocking on-board flash driver
pub type BoardFlash<'d> = Flash<'d, FLASH, Blocking, FLASH_SIZE>;

/// On-board flash with word access
pub type Rp2040Flash<'d> = NorFlashWords<BoardFlash<'d>>;

/// Create the word-access flash driver
pub fn new_flash<'d>(flash: Peri<'d, FLASH>) -> Result<Rp2040Flash<'d>, FlashError> {
    NorFlashWords::new(Flash::new_blocking(flash))
}

/// Mount the file store on the default partition
///
/// Recovers the active log, or formats log A on a blank partition.
pub fn mount<'d>(flash: Peri<'d, FLASH>) -> Result<Jpfs<Rp2040Flash<'d>>, JpfsError> {
    let flash = new_flash(flash)?;
    Jpfs::init(flash, JPFS_GEOMETRY)
}
