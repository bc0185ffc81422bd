//! Word access over `embedded-storage` NOR flash drivers
//!
//! Any driver implementing [`MultiwriteNorFlash`] can back the file store:
//! NOR flash erases to all ones and tolerates programming a word again as
//! long as bits only move from 1 to 0, which is exactly what tainting a
//! block requires.

use embedded_storage::nor_flash::{
    MultiwriteNorFlash, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::flash::{BitDefault, FlashError, WordFlash, WORD_SIZE};

/// Words moved per driver call
const CHUNK_WORDS: usize = 8;

impl From<NorFlashErrorKind> for FlashError {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashError::Misaligned,
            NorFlashErrorKind::OutOfBounds => FlashError::OutOfBounds,
            _ => FlashError::Flash,
        }
    }
}

fn map_err<E: NorFlashError>(err: E) -> FlashError {
    err.kind().into()
}

/// [`WordFlash`] adapter for a NOR flash driver
///
/// Addresses are offsets from the start of the driver's address space.
/// Words are stored little-endian.
pub struct NorFlashWords<T> {
    flash: T,
}

impl<T: MultiwriteNorFlash> NorFlashWords<T> {
    /// Wrap a NOR flash driver
    ///
    /// Fails with [`FlashError::Unsupported`] if the driver cannot read or
    /// program single words.
    pub fn new(flash: T) -> Result<Self, FlashError> {
        let word = WORD_SIZE as usize;
        if T::READ_SIZE == 0 || T::WRITE_SIZE == 0 {
            return Err(FlashError::Unsupported);
        }
        if word % T::READ_SIZE != 0 || word % T::WRITE_SIZE != 0 {
            return Err(FlashError::Unsupported);
        }
        Ok(Self { flash })
    }

    /// Get the wrapped driver for low-level access
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.flash
    }

    /// Release the wrapped driver
    pub fn into_inner(self) -> T {
        self.flash
    }

    fn check_aligned(addr: u32) -> Result<(), FlashError> {
        if addr % WORD_SIZE != 0 {
            return Err(FlashError::Misaligned);
        }
        Ok(())
    }
}

impl<T: MultiwriteNorFlash> WordFlash for NorFlashWords<T> {
    fn bit_default(&self) -> BitDefault {
        BitDefault::Ones
    }

    fn page_size(&self) -> u32 {
        T::ERASE_SIZE as u32
    }

    fn read(&mut self, addr: u32, dst: &mut [u32]) -> Result<(), FlashError> {
        Self::check_aligned(addr)?;
        let mut bytes = [0u8; CHUNK_WORDS * 4];
        let mut offset = addr;
        for words in dst.chunks_mut(CHUNK_WORDS) {
            let buf = &mut bytes[..words.len() * 4];
            self.flash.read(offset, buf).map_err(map_err)?;
            for (word, raw) in words.iter_mut().zip(buf.chunks_exact(4)) {
                *word = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            }
            offset += buf.len() as u32;
        }
        Ok(())
    }

    fn write(&mut self, addr: u32, src: &[u32], erase_first: bool) -> Result<(), FlashError> {
        Self::check_aligned(addr)?;
        let page = self.page_size();
        let mut offset = addr;
        for &word in src {
            if erase_first && offset % page == 0 {
                self.flash.erase(offset, offset + page).map_err(map_err)?;
            }
            self.flash
                .write(offset, &word.to_le_bytes())
                .map_err(map_err)?;
            offset += WORD_SIZE;
        }
        Ok(())
    }

    fn erase(&mut self, addr: u32, nwords: u32) -> Result<(), FlashError> {
        let page = self.page_size();
        let len = nwords * WORD_SIZE;
        if addr % page != 0 || len % page != 0 {
            return Err(FlashError::Misaligned);
        }
        self.flash.erase(addr, addr + len).map_err(map_err)
    }
}
