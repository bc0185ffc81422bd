//! Raw log accessor
//!
//! Block-granular access to the two logs on the medium. Everything above
//! this layer addresses blocks by (log, index); only here do they become
//! byte addresses.

use jpfs_hal::{FlashError, WordFlash};

use crate::block::{Block, Codec, BLOCK_SIZE, BLOCK_WORDS, LOG_MAGIC};
use crate::config::Geometry;

/// First block that can hold entries or data; block 0 carries the marker
pub(crate) const FIRST_BLOCK: u32 = 1;

/// One of the two ping-pong logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogIndex {
    A,
    B,
}

impl LogIndex {
    /// The other log
    pub const fn other(self) -> Self {
        match self {
            LogIndex::A => LogIndex::B,
            LogIndex::B => LogIndex::A,
        }
    }
}

/// Block access to both logs of a partition
pub(crate) struct Logs<F> {
    flash: F,
    base: [u32; 2],
    nblocks: u32,
    codec: Codec,
}

impl<F: WordFlash> Logs<F> {
    pub fn new(flash: F, geometry: &Geometry) -> Self {
        let codec = Codec::new(flash.bit_default());
        Self {
            flash,
            base: [geometry.log_a, geometry.log_b],
            nblocks: geometry.blocks(),
            codec,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Blocks per log
    pub fn nblocks(&self) -> u32 {
        self.nblocks
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    #[cfg(test)]
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn block_addr(&self, log: LogIndex, index: u32) -> u32 {
        assert!(index < self.nblocks, "block {} outside of log", index);
        self.base[log as usize] + index * BLOCK_SIZE
    }

    pub fn load(&mut self, log: LogIndex, index: u32) -> Result<Block, FlashError> {
        let mut block = Block::zeroed();
        let addr = self.block_addr(log, index);
        self.flash.read(addr, &mut block.0)?;
        Ok(block)
    }

    /// Append `block` at `*free` and advance it
    pub fn append(&mut self, log: LogIndex, free: &mut u32, block: &Block) -> Result<(), FlashError> {
        let addr = self.block_addr(log, *free);
        self.flash.write(addr, &block.0, false)?;
        *free += 1;
        Ok(())
    }

    /// Invalidate a block by programming its info word
    pub fn taint_block(&mut self, log: LogIndex, index: u32) -> Result<(), FlashError> {
        let addr = self.block_addr(log, index);
        self.flash.write_word(addr, self.codec.taint_word())
    }

    pub fn has_magic(&mut self, log: LogIndex) -> Result<bool, FlashError> {
        let addr = self.block_addr(log, 0);
        Ok(self.flash.read_word(addr)? == LOG_MAGIC)
    }

    pub fn write_magic(&mut self, log: LogIndex) -> Result<(), FlashError> {
        let addr = self.block_addr(log, 0);
        self.flash.write_word(addr, LOG_MAGIC)
    }

    /// Destroy the marker so the log is never mounted again before an erase
    pub fn taint_log(&mut self, log: LogIndex) -> Result<(), FlashError> {
        self.taint_block(log, 0)
    }

    pub fn erase(&mut self, log: LogIndex) -> Result<(), FlashError> {
        let addr = self.block_addr(log, 0);
        self.flash
            .erase(addr, self.nblocks * BLOCK_WORDS as u32)
    }

    /// Recover the free pointer: first block after the last written one
    pub fn find_free(&mut self, log: LogIndex) -> Result<u32, FlashError> {
        let bit_default = self.codec.bit_default();
        let mut free = self.nblocks;
        while free > FIRST_BLOCK {
            if !self.load(log, free - 1)?.is_erased(bit_default) {
                break;
            }
            free -= 1;
        }
        Ok(free)
    }
}
