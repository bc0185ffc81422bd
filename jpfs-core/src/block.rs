//! Block codec
//!
//! Every log is a sequence of 8-word blocks. Word 0 of a block is its info
//! word, whose two low bits tag the block kind:
//!
//! ```text
//!  3          2          1          0
//! 10987654 32109876 54321098 76543210
//!                            iiiiiiTT - entry block
//! bbbbbbbb bbbbbbbs ssssssss iiiiiiTT - data start block
//! dddddddd dddddddd dddddddd dddddddT - data continuation block
//! ```
//!
//! `i` is the file id, `s` the file size, `b` the restore bits and `d`
//! file data. Tag values depend on the medium's bit-default so that a
//! tainted info word (all bits programmed) always reads back as a
//! continuation block, which scanning ignores.
//!
//! | kind         | erased = 1 | erased = 0 |
//! |--------------|------------|------------|
//! | entry        | `..11`     | `..00`     |
//! | data start   | `..01`     | `..10`     |
//! | data cont.   | `...0`     | `...1`     |

use jpfs_hal::BitDefault;

/// Words per block
pub const BLOCK_WORDS: usize = 8;

/// Bytes per block
pub const BLOCK_SIZE: u32 = 32;

/// Length of a UFID in bytes
pub const UFID_LEN: usize = 12;

/// Maximum file size in bytes (16 blocks minus info and CRC words)
pub const MAX_FILE_SIZE: usize = 504;

/// Maximum number of files (6-bit id)
pub const MAX_FILES: usize = 64;

/// Marker in word 0 of block 0 of the active log ("JPFS")
pub const LOG_MAGIC: u32 = 0x5346_504A;

/// Content bytes in a start block followed by continuation blocks
pub(crate) const START_CAPACITY: usize = 28;
/// Content bytes in a start block that also ends the chain
pub(crate) const LAST_START_CAPACITY: usize = 24;
/// Content bytes in a continuation block followed by more blocks
pub(crate) const CONT_CAPACITY: usize = 32;
/// Content bytes in the continuation block that ends the chain
pub(crate) const LAST_CONT_CAPACITY: usize = 28;

const TAG_MASK: u32 = 0b11;
const ID_SHIFT: u32 = 2;
const ID_MASK: u32 = 0x3f;
const SIZE_SHIFT: u32 = 8;
const SIZE_MASK: u32 = 0x1ff;
const RESTORE_SHIFT: u32 = 17;
const RESTORE_MASK: u32 = 0x7fff;

/// Unique file identifier chosen by the caller
pub type Ufid = [u8; UFID_LEN];

/// Logical file id (0-63) a UFID is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileId(u8);

impl FileId {
    /// Create an id, or `None` if it does not fit in 6 bits
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < MAX_FILES {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Get the id as a byte value
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Bit for this id in a 64-bit usage mask
    pub(crate) const fn mask(self) -> u64 {
        1 << self.0
    }
}

/// Decoded block kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockKind {
    /// Binds a UFID to a file id
    Entry { id: FileId },
    /// First block of a data chain
    DataStart {
        id: FileId,
        size: u16,
        restore: u16,
    },
    /// Any further block of a data chain, or a tainted block
    DataCont,
}

/// Info word encoder/decoder for one medium polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    bit_default: BitDefault,
}

impl Codec {
    pub const fn new(bit_default: BitDefault) -> Self {
        Self { bit_default }
    }

    pub const fn bit_default(self) -> BitDefault {
        self.bit_default
    }

    const fn entry_tag(self) -> u32 {
        match self.bit_default {
            BitDefault::Ones => 0b11,
            BitDefault::Zeros => 0b00,
        }
    }

    const fn data_start_tag(self) -> u32 {
        match self.bit_default {
            BitDefault::Ones => 0b01,
            BitDefault::Zeros => 0b10,
        }
    }

    /// Decode an info word
    ///
    /// Total: every word maps to some kind. Garbage is rejected later by
    /// CRC validation.
    pub fn decode(self, info: u32) -> BlockKind {
        let tag = info & TAG_MASK;
        let id = FileId(((info >> ID_SHIFT) & ID_MASK) as u8);
        if tag == self.entry_tag() {
            BlockKind::Entry { id }
        } else if tag == self.data_start_tag() {
            BlockKind::DataStart {
                id,
                size: ((info >> SIZE_SHIFT) & SIZE_MASK) as u16,
                restore: ((info >> RESTORE_SHIFT) & RESTORE_MASK) as u16,
            }
        } else {
            // the two remaining tag patterns share the continuation bit
            BlockKind::DataCont
        }
    }

    /// Encode the info word of an entry block
    pub fn entry_info(self, id: FileId) -> u32 {
        (u32::from(id.0) << ID_SHIFT) | self.entry_tag()
    }

    /// Encode the info word of a data start block
    ///
    /// # Panics
    /// If `size` does not fit the 9-bit size field.
    pub fn data_start_info(self, id: FileId, size: usize, restore: u16) -> u32 {
        assert!(size as u32 <= SIZE_MASK, "file size {} out of range", size);
        ((u32::from(restore) & RESTORE_MASK) << RESTORE_SHIFT)
            | ((size as u32) << SIZE_SHIFT)
            | (u32::from(id.0) << ID_SHIFT)
            | self.data_start_tag()
    }

    /// Force the continuation tag into the first word of a continuation block
    pub fn with_cont_tag(self, word: u32) -> u32 {
        match self.bit_default {
            BitDefault::Ones => word & !1,
            BitDefault::Zeros => word | 1,
        }
    }

    /// Info word that invalidates any block it is written over
    pub fn taint_word(self) -> u32 {
        self.bit_default.programmed_word()
    }
}

/// Put back the data bit a continuation tag displaced
pub fn restore_low_bit(word: u32, bit: bool) -> u32 {
    (word & !1) | u32::from(bit)
}

/// Number of blocks a chain of `size` content bytes occupies
///
/// One block up to 24 bytes; beyond that a 28-byte start block, 32-byte
/// continuation blocks and a final block with room for 28 bytes.
pub fn blocks_needed(size: usize) -> u32 {
    if size <= LAST_START_CAPACITY {
        1
    } else {
        2 + ((size - 25) >> 5) as u32
    }
}

/// CRC-32 over words in little-endian byte order, continuing from `seed`
pub fn crc32(seed: u32, words: &[u32]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    for word in words {
        hasher.update(&word.to_le_bytes());
    }
    hasher.finalize()
}

/// Pack bytes into little-endian words, zero-filling the remainder
pub(crate) fn pack_bytes(dst: &mut [u32], src: &[u8]) {
    for (i, word) in dst.iter_mut().enumerate() {
        let mut raw = [0u8; 4];
        let start = (i * 4).min(src.len());
        let end = (start + 4).min(src.len());
        raw[..end - start].copy_from_slice(&src[start..end]);
        *word = u32::from_le_bytes(raw);
    }
}

/// Unpack little-endian words into `dst`, stopping at whichever runs out first
///
/// Returns the number of bytes written.
pub(crate) fn unpack_bytes(dst: &mut [u8], src: &[u32]) -> usize {
    let mut n = 0;
    for (chunk, word) in dst.chunks_mut(4).zip(src) {
        let raw = word.to_le_bytes();
        chunk.copy_from_slice(&raw[..chunk.len()]);
        n += chunk.len();
    }
    n
}

/// One raw 8-word block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block(pub [u32; BLOCK_WORDS]);

impl Block {
    /// All-zero block
    pub const fn zeroed() -> Self {
        Self([0; BLOCK_WORDS])
    }

    /// Info word
    pub fn info(&self) -> u32 {
        self.0[0]
    }

    /// Build a CRC-protected entry block
    pub fn entry(codec: Codec, id: FileId, ufid: &Ufid) -> Self {
        let mut block = Self::zeroed();
        block.0[0] = codec.entry_info(id);
        pack_bytes(&mut block.0[1..4], ufid);
        block.0[7] = crc32(0, &block.0[..7]);
        block
    }

    /// UFID carried by an entry block
    pub fn ufid(&self) -> Ufid {
        let mut ufid = [0u8; UFID_LEN];
        unpack_bytes(&mut ufid, &self.0[1..4]);
        ufid
    }

    /// Check the CRC an entry or chain-ending block carries in its last word
    pub fn crc_matches(&self, seed: u32) -> bool {
        crc32(seed, &self.0[..BLOCK_WORDS - 1]) == self.0[BLOCK_WORDS - 1]
    }

    /// Check whether every word is still in the erased state
    pub fn is_erased(&self, bit_default: BitDefault) -> bool {
        let erased = bit_default.erased_word();
        self.0.iter().all(|&w| w == erased)
    }
}
