//! Writer
//!
//! A save appends a new chain for the file and never touches the old one;
//! the old chain is simply no longer the latest. The chain's CRC word is
//! the last word written, so the new content becomes visible atomically.

use jpfs_hal::{FlashError, WordFlash};

use crate::block::{
    blocks_needed, crc32, pack_bytes, Block, FileId, Ufid, BLOCK_WORDS, CONT_CAPACITY,
    LAST_CONT_CAPACITY, LAST_START_CAPACITY, MAX_FILE_SIZE, START_CAPACITY,
};
use crate::error::JpfsError;
use crate::manager::Jpfs;
use crate::scan::EntryLookup;

/// Restore bits for `data`: bit `j` is the low bit of the first byte of
/// continuation block `j`, which the continuation tag overwrites
fn restore_bits(data: &[u8], nblocks: u32) -> u16 {
    let mut restore = 0;
    for j in 0..nblocks.saturating_sub(1) as usize {
        let pos = START_CAPACITY + j * CONT_CAPACITY;
        if data.get(pos).is_some_and(|b| b & 1 == 1) {
            restore |= 1 << j;
        }
    }
    restore
}

impl<F: WordFlash> Jpfs<F> {
    /// Store `data` as the new content of the file `ufid`
    ///
    /// Creates the file if it does not exist. If the active log cannot take
    /// the new chain, the log is rotated once; a save never rotates twice.
    pub fn save(&mut self, ufid: &Ufid, data: &[u8]) -> Result<(), JpfsError> {
        if data.len() > MAX_FILE_SIZE {
            warn!("jpfs: invalid size {}", data.len());
            return Err(JpfsError::TooLarge);
        }

        let mut rotated = false;
        loop {
            // resolved again after a rotation, which drops orphaned entries
            let (id, new_entry) = match self.scanner().find_entry(ufid)? {
                EntryLookup::Found { id, .. } => (id, false),
                EntryLookup::Vacant(Some(id)) => (id, true),
                EntryLookup::Vacant(None) => {
                    warn!("jpfs: no more file ids available");
                    return Err(JpfsError::NoFileIds);
                }
            };

            let needed = blocks_needed(data.len()) + u32::from(new_entry);
            let available = self.available();
            if needed <= available {
                if new_entry {
                    let entry = Block::entry(self.logs.codec(), id, ufid);
                    self.append(&entry)?;
                }
                self.write_chain(id, data)?;
                return Ok(());
            }

            if rotated {
                warn!("jpfs: giving up");
                return Err(JpfsError::NoSpace);
            }
            warn!("jpfs: journal full ({}/{})", needed, available);
            self.rotate()?;
            rotated = true;
        }
    }

    /// Remove the file `ufid`
    ///
    /// Only the entry block is invalidated; the data stays behind as an
    /// orphan until the next rotation.
    pub fn remove(&mut self, ufid: &Ufid) -> Result<(), JpfsError> {
        match self.scanner().find_entry(ufid)? {
            EntryLookup::Found { index, .. } => {
                self.logs.taint_block(self.active, index)?;
                Ok(())
            }
            EntryLookup::Vacant(_) => Err(JpfsError::NotFound),
        }
    }

    fn write_chain(&mut self, id: FileId, data: &[u8]) -> Result<(), FlashError> {
        let codec = self.logs.codec();
        let nblocks = blocks_needed(data.len());
        let restore = restore_bits(data, nblocks);

        let mut crc = 0;
        let mut offset = 0;
        for i in 0..nblocks {
            let last = i + 1 == nblocks;
            // content words of this block and how many bytes they hold
            let (first_word, end_word, capacity) = match (i == 0, last) {
                (true, true) => (1, BLOCK_WORDS - 1, LAST_START_CAPACITY),
                (true, false) => (1, BLOCK_WORDS, START_CAPACITY),
                (false, true) => (0, BLOCK_WORDS - 1, LAST_CONT_CAPACITY),
                (false, false) => (0, BLOCK_WORDS, CONT_CAPACITY),
            };
            let chunk_end = (offset + capacity).min(data.len());
            let chunk = &data[offset..chunk_end];
            offset = chunk_end;

            let mut block = Block::zeroed();
            pack_bytes(&mut block.0[first_word..end_word], chunk);
            block.0[0] = if i == 0 {
                codec.data_start_info(id, data.len(), restore)
            } else {
                codec.with_cont_tag(block.0[0])
            };

            if last {
                block.0[BLOCK_WORDS - 1] = crc32(crc, &block.0[..BLOCK_WORDS - 1]);
            } else {
                crc = crc32(crc, &block.0);
            }
            self.append(&block)?;
        }
        trace!("jpfs: wrote {} bytes in {} blocks for {}", data.len(), nblocks, id);
        Ok(())
    }
}
