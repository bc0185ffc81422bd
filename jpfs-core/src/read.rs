//! Reader

use heapless::Vec;
use jpfs_hal::{FlashError, WordFlash};

use crate::block::{
    restore_low_bit, unpack_bytes, Ufid, BLOCK_WORDS, CONT_CAPACITY, LAST_CONT_CAPACITY,
    LAST_START_CAPACITY, MAX_FILE_SIZE, START_CAPACITY,
};
use crate::error::JpfsError;
use crate::manager::Jpfs;
use crate::scan::{DataChain, EntryLookup};

impl<F: WordFlash> Jpfs<F> {
    /// Read the file `ufid` into `dst`
    ///
    /// Copies `min(dst.len(), size)` bytes and leaves the rest of `dst`
    /// untouched. Returns the stored size, so an empty `dst` queries the
    /// size only.
    pub fn read(&mut self, ufid: &Ufid, dst: &mut [u8]) -> Result<usize, JpfsError> {
        let chain = self.locate(ufid)?.ok_or(JpfsError::NotFound)?;
        self.read_chain(&chain, dst)?;
        Ok(usize::from(chain.size))
    }

    /// Stored size of the file `ufid`
    pub fn size(&mut self, ufid: &Ufid) -> Result<usize, JpfsError> {
        self.read(ufid, &mut [])
    }

    /// Whether `ufid` has readable content
    pub fn exists(&mut self, ufid: &Ufid) -> Result<bool, JpfsError> {
        Ok(self.locate(ufid)?.is_some())
    }

    /// Read the whole file `ufid`
    pub fn read_to_vec(&mut self, ufid: &Ufid) -> Result<Vec<u8, MAX_FILE_SIZE>, JpfsError> {
        let chain = self.locate(ufid)?.ok_or(JpfsError::NotFound)?;
        let mut buf = Vec::new();
        buf.resize(usize::from(chain.size), 0)
            .map_err(|_| JpfsError::TooLarge)?;
        self.read_chain(&chain, &mut buf)?;
        Ok(buf)
    }

    /// Latest valid chain of `ufid`, pruning the ones it supersedes
    fn locate(&mut self, ufid: &Ufid) -> Result<Option<DataChain>, FlashError> {
        let EntryLookup::Found { id, index } = self.scanner().find_entry(ufid)? else {
            return Ok(None);
        };
        let chain = self.scanner().latest_data(id, index + 1, true)?;
        if chain.is_none() {
            debug!("jpfs: ignoring orphaned entry {}", id);
        }
        Ok(chain)
    }

    fn read_chain(&mut self, chain: &DataChain, dst: &mut [u8]) -> Result<(), FlashError> {
        let len = dst.len().min(usize::from(chain.size));
        let dst = &mut dst[..len];

        let mut offset = 0;
        for (i, index) in (chain.start..chain.end).enumerate() {
            if offset >= len {
                break;
            }
            let mut block = self.logs.load(self.active, index)?;
            let last = index + 1 == chain.end;
            let (first_word, end_word, capacity) = match (i == 0, last) {
                (true, true) => (1, BLOCK_WORDS - 1, LAST_START_CAPACITY),
                (true, false) => (1, BLOCK_WORDS, START_CAPACITY),
                (false, true) => (0, BLOCK_WORDS - 1, LAST_CONT_CAPACITY),
                (false, false) => (0, BLOCK_WORDS, CONT_CAPACITY),
            };
            if i > 0 {
                let bit = chain.restore & (1 << (i - 1)) != 0;
                block.0[0] = restore_low_bit(block.0[0], bit);
            }

            let end = (offset + capacity).min(len);
            offset += unpack_bytes(&mut dst[offset..end], &block.0[first_word..end_word]);
        }
        Ok(())
    }
}
