//! In-memory flash simulator
//!
//! Backs host tests with a fixed array of words that behaves like the real
//! medium: erase resets whole pages to the bit-default, and programming a
//! word that would move any bit back toward the erased state panics. This
//! turns an accidental "un-erase" in the file store into a test failure
//! instead of silent corruption on hardware.

use crate::flash::{BitDefault, FlashError, WordFlash, WORD_SIZE};

/// Fill pattern of a simulator that was never erased
pub const GARBAGE_WORD: u32 = 0xA5A5_A5A5;

/// Simulated flash of `N` words
pub struct SimFlash<const N: usize> {
    words: [u32; N],
    bit_default: BitDefault,
    page_size: u32,
}

impl<const N: usize> SimFlash<N> {
    /// Create a simulator filled with [`GARBAGE_WORD`]
    ///
    /// # Panics
    /// If `page_size` is not a non-zero multiple of the word size that
    /// divides the simulated capacity.
    pub fn new(bit_default: BitDefault, page_size: u32) -> Self {
        assert!(page_size >= WORD_SIZE && page_size % WORD_SIZE == 0);
        assert!((N as u32 * WORD_SIZE) % page_size == 0);
        Self {
            words: [GARBAGE_WORD; N],
            bit_default,
            page_size,
        }
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> u32 {
        N as u32 * WORD_SIZE
    }

    /// Read a word without going through the medium contract
    pub fn peek(&self, addr: u32) -> u32 {
        self.words[self.index(addr, 1)]
    }

    /// Overwrite a word ignoring the one-directional rule
    ///
    /// Used to simulate bit rot and torn writes.
    pub fn poke(&mut self, addr: u32, value: u32) {
        let i = self.index(addr, 1);
        self.words[i] = value;
    }

    fn index(&self, addr: u32, nwords: usize) -> usize {
        assert_eq!(addr % WORD_SIZE, 0, "unaligned flash address {:#x}", addr);
        let i = (addr / WORD_SIZE) as usize;
        assert!(i + nwords <= N, "flash access out of range at {:#x}", addr);
        i
    }

    fn erase_page_at(&mut self, i: usize) {
        let page_words = (self.page_size / WORD_SIZE) as usize;
        let erased = self.bit_default.erased_word();
        self.words[i..i + page_words].fill(erased);
    }

    fn program(&mut self, i: usize, value: u32) {
        let old = self.words[i];
        assert!(
            self.bit_default.can_program(old, value),
            "illegal flash write at word {}: {:#010x} -> {:#010x}",
            i,
            old,
            value
        );
        self.words[i] = value;
    }
}

impl<const N: usize> WordFlash for SimFlash<N> {
    fn bit_default(&self) -> BitDefault {
        self.bit_default
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn read(&mut self, addr: u32, dst: &mut [u32]) -> Result<(), FlashError> {
        let i = self.index(addr, dst.len());
        dst.copy_from_slice(&self.words[i..i + dst.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u32, src: &[u32], erase_first: bool) -> Result<(), FlashError> {
        let i = self.index(addr, src.len());
        let page_words = (self.page_size / WORD_SIZE) as usize;
        for (k, &value) in src.iter().enumerate() {
            if erase_first && (i + k) % page_words == 0 {
                self.erase_page_at(i + k);
            }
            self.program(i + k, value);
        }
        Ok(())
    }

    fn erase(&mut self, addr: u32, nwords: u32) -> Result<(), FlashError> {
        if addr % self.page_size != 0 || (nwords * WORD_SIZE) % self.page_size != 0 {
            return Err(FlashError::Misaligned);
        }
        let i = self.index(addr, nwords as usize);
        let page_words = (self.page_size / WORD_SIZE) as usize;
        for page in (i..i + nwords as usize).step_by(page_words) {
            self.erase_page_at(page);
        }
        Ok(())
    }
}
