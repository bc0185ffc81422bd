//! Flash word-access abstractions
//!
//! Provides the blocking, 32-bit word contract the file store is written
//! against. Addresses are byte offsets into the medium and must be
//! word aligned.

/// Size of one flash word in bytes
pub const WORD_SIZE: u32 = 4;

/// Value flash cells settle to after a page erase
///
/// Outside of an erase, a write can only move bits away from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitDefault {
    /// Erased cells read as 1 (NOR flash)
    Ones,
    /// Erased cells read as 0 (some EEPROMs)
    Zeros,
}

impl BitDefault {
    /// Word value of a freshly erased location
    pub const fn erased_word(self) -> u32 {
        match self {
            BitDefault::Ones => u32::MAX,
            BitDefault::Zeros => 0,
        }
    }

    /// Word value with every bit in the programmed state
    pub const fn programmed_word(self) -> u32 {
        !self.erased_word()
    }

    /// Check whether `new` can be written over `old` without an erase
    pub const fn can_program(self, old: u32, new: u32) -> bool {
        match self {
            BitDefault::Ones => new & !old == 0,
            BitDefault::Zeros => !new & old == 0,
        }
    }
}

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Flash operation failed
    Flash,
    /// Address range outside of the medium
    OutOfBounds,
    /// Address or length not aligned to a word or page
    Misaligned,
    /// Medium cannot provide word-granular access
    Unsupported,
}

/// Word-granular flash trait
///
/// All operations are blocking and complete before returning. Implementations
/// must honor the one-directional write rule: outside of [`erase`] (or a
/// write with `erase_first`), programming a word may only move bits away from
/// [`bit_default`].
///
/// [`erase`]: WordFlash::erase
/// [`bit_default`]: WordFlash::bit_default
pub trait WordFlash {
    /// Erased state of this medium
    fn bit_default(&self) -> BitDefault;

    /// Erase granularity in bytes
    fn page_size(&self) -> u32;

    /// Read `dst.len()` words starting at `addr`
    fn read(&mut self, addr: u32, dst: &mut [u32]) -> Result<(), FlashError>;

    /// Program `src` starting at `addr`
    ///
    /// With `erase_first`, every page the range starts in is erased before
    /// its first word is written.
    fn write(&mut self, addr: u32, src: &[u32], erase_first: bool) -> Result<(), FlashError>;

    /// Erase `nwords` words starting at the page-aligned `addr`
    fn erase(&mut self, addr: u32, nwords: u32) -> Result<(), FlashError>;

    /// Read a single word
    fn read_word(&mut self, addr: u32) -> Result<u32, FlashError> {
        let mut word = [0u32; 1];
        self.read(addr, &mut word)?;
        Ok(word[0])
    }

    /// Program a single word
    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), FlashError> {
        self.write(addr, &[value], false)
    }
}

impl<T: WordFlash + ?Sized> WordFlash for &mut T {
    fn bit_default(&self) -> BitDefault {
        T::bit_default(self)
    }

    fn page_size(&self) -> u32 {
        T::page_size(self)
    }

    fn read(&mut self, addr: u32, dst: &mut [u32]) -> Result<(), FlashError> {
        T::read(self, addr, dst)
    }

    fn write(&mut self, addr: u32, src: &[u32], erase_first: bool) -> Result<(), FlashError> {
        T::write(self, addr, src, erase_first)
    }

    fn erase(&mut self, addr: u32, nwords: u32) -> Result<(), FlashError> {
        T::erase(self, addr, nwords)
    }

    fn read_word(&mut self, addr: u32) -> Result<u32, FlashError> {
        T::read_word(self, addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), FlashError> {
        T::write_word(self, addr, value)
    }
}
