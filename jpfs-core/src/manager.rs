//! Log manager
//!
//! Owns the medium and decides which of the two logs is active. Content is
//! only ever appended to the active log; when it fills up, [`Jpfs::rotate`]
//! copies everything still live into the other log and switches over.
//!
//! # Mount
//!
//! A log is active when word 0 of its block 0 holds the magic. Log A wins
//! if both carry it, which is the state left behind by a rotation into A
//! that lost power before the old log was tainted. If neither does, the
//! medium is unformatted and log A is erased and activated empty.

use jpfs_hal::{FlashError, WordFlash};

use crate::block::Block;
use crate::config::Geometry;
use crate::error::JpfsError;
use crate::log::{LogIndex, Logs, FIRST_BLOCK};
use crate::scan::Scanner;

/// Block usage of the active log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogStats {
    /// Log currently appended to
    pub active: LogIndex,
    /// Blocks available for entries and data (the marker block excluded)
    pub total_blocks: u32,
    /// Blocks left before the next rotation
    pub free_blocks: u32,
}

/// Handle to a mounted file store
///
/// All operations take `&mut self`; callers sharing a store across tasks
/// wrap it in their own mutex.
pub struct Jpfs<F> {
    pub(crate) logs: Logs<F>,
    pub(crate) active: LogIndex,
    pub(crate) free: u32,
}

impl<F: WordFlash> Jpfs<F> {
    /// Mount the store, formatting log A if no log is active
    pub fn init(flash: F, geometry: Geometry) -> Result<Self, JpfsError> {
        geometry.validate(flash.page_size())?;
        let mut logs = Logs::new(flash, &geometry);

        for log in [LogIndex::A, LogIndex::B] {
            if logs.has_magic(log)? {
                let free = logs.find_free(log)?;
                info!("jpfs: using log {} ({} blocks used)", log, free);
                return Ok(Self {
                    logs,
                    active: log,
                    free,
                });
            }
        }

        info!("jpfs: no active log, formatting log A");
        logs.erase(LogIndex::A)?;
        let mut fs = Self {
            logs,
            active: LogIndex::B,
            free: FIRST_BLOCK,
        };
        fs.activate(LogIndex::A, FIRST_BLOCK)?;
        Ok(fs)
    }

    /// Compact the active log into the other one
    ///
    /// Every entry that still has a valid chain is carried over together with
    /// its latest chain; removed files, superseded chains and orphans are
    /// left behind. Runs automatically when a save does not fit.
    pub fn rotate(&mut self) -> Result<(), JpfsError> {
        let src = self.active;
        let dst = src.other();
        let end = self.free;
        self.logs.erase(dst)?;

        let mut free = FIRST_BLOCK;
        let mut start = FIRST_BLOCK;
        loop {
            let found = Scanner::new(&mut self.logs, src, end).next_entry(start)?;
            let Some(entry) = found else {
                break;
            };
            start = entry.index + 1;

            let chain = Scanner::new(&mut self.logs, src, end).latest_data(entry.id, start, false)?;
            let Some(chain) = chain else {
                debug!("jpfs: skipping orphaned entry {}", entry.id);
                continue;
            };

            self.logs.append(dst, &mut free, &entry.block)?;
            for index in chain.start..chain.end {
                let block = self.logs.load(src, index)?;
                self.logs.append(dst, &mut free, &block)?;
            }
        }

        self.activate(dst, free)?;
        info!("jpfs: log rotated ({}/{} blocks live)", free, self.logs.nblocks());
        Ok(())
    }

    /// Usage of the active log
    pub fn stats(&self) -> LogStats {
        let nblocks = self.logs.nblocks();
        LogStats {
            active: self.active,
            total_blocks: nblocks - FIRST_BLOCK,
            free_blocks: nblocks - self.free,
        }
    }

    /// Unmount and hand the medium back
    pub fn into_inner(self) -> F {
        self.logs.into_inner()
    }

    /// Make `log` active with its free pointer at `free`
    ///
    /// The new marker goes down before the old one is destroyed, so a power
    /// cut in between leaves two valid logs rather than none.
    fn activate(&mut self, log: LogIndex, free: u32) -> Result<(), FlashError> {
        if !self.logs.has_magic(log)? {
            self.logs.write_magic(log)?;
        }
        let other = log.other();
        if self.logs.has_magic(other)? {
            self.logs.taint_log(other)?;
        }
        self.active = log;
        self.free = free;
        Ok(())
    }

    pub(crate) fn scanner(&mut self) -> Scanner<'_, F> {
        Scanner::new(&mut self.logs, self.active, self.free)
    }

    pub(crate) fn append(&mut self, block: &Block) -> Result<(), FlashError> {
        self.logs.append(self.active, &mut self.free, block)
    }

    /// Blocks left in the active log
    pub(crate) fn available(&self) -> u32 {
        self.logs.nblocks() - self.free
    }
}
