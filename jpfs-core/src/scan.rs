//! Log scanner
//!
//! Forward scans over the written part of one log. Anything that does not
//! validate (bad CRC, impossible size, chain interrupted by a foreign
//! block) is skipped as if it had never been written; this is what makes
//! torn writes invisible rather than fatal.

use jpfs_hal::{FlashError, WordFlash};

use crate::block::{blocks_needed, crc32, Block, BlockKind, FileId, Ufid, MAX_FILE_SIZE};
use crate::log::{LogIndex, Logs, FIRST_BLOCK};

/// A valid entry block found by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryRef {
    pub id: FileId,
    pub ufid: Ufid,
    pub index: u32,
    pub block: Block,
}

/// Result of looking a UFID up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryLookup {
    /// Entry block at `index` maps the UFID to `id`
    Found { id: FileId, index: u32 },
    /// No entry; lowest unused id, `None` once all 64 are taken
    Vacant(Option<FileId>),
}

/// A data chain whose CRC validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DataChain {
    /// Index of the start block
    pub start: u32,
    /// Index one past the last block
    pub end: u32,
    pub size: u16,
    pub restore: u16,
}

/// Scanner over blocks `[FIRST_BLOCK, end)` of one log
pub(crate) struct Scanner<'a, F> {
    logs: &'a mut Logs<F>,
    log: LogIndex,
    end: u32,
}

impl<'a, F: WordFlash> Scanner<'a, F> {
    pub fn new(logs: &'a mut Logs<F>, log: LogIndex, end: u32) -> Self {
        Self { logs, log, end }
    }

    /// First valid entry at or after `start`
    pub fn next_entry(&mut self, start: u32) -> Result<Option<EntryRef>, FlashError> {
        let codec = self.logs.codec();
        for index in start..self.end {
            let block = self.logs.load(self.log, index)?;
            if let BlockKind::Entry { id } = codec.decode(block.info()) {
                if block.crc_matches(0) {
                    return Ok(Some(EntryRef {
                        id,
                        ufid: block.ufid(),
                        index,
                        block,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Look up the entry for `ufid`, or the id a new entry would get
    pub fn find_entry(&mut self, ufid: &Ufid) -> Result<EntryLookup, FlashError> {
        let mut used: u64 = 0;
        let mut start = FIRST_BLOCK;
        while let Some(entry) = self.next_entry(start)? {
            if entry.ufid == *ufid {
                return Ok(EntryLookup::Found {
                    id: entry.id,
                    index: entry.index,
                });
            }
            used |= entry.id.mask();
            start = entry.index + 1;
        }

        let unused = !used;
        let next = if unused != 0 {
            FileId::new(unused.trailing_zeros() as u8)
        } else {
            None
        };
        Ok(EntryLookup::Vacant(next))
    }

    /// First valid chain for `id` starting at or after `start`
    pub fn next_data(&mut self, id: FileId, start: u32) -> Result<Option<DataChain>, FlashError> {
        let codec = self.logs.codec();
        for index in start..self.end {
            let head = self.logs.load(self.log, index)?;
            if let BlockKind::DataStart {
                id: found,
                size,
                restore,
            } = codec.decode(head.info())
            {
                if found != id {
                    continue;
                }
                // a rejected start block is not retried; scanning goes on
                // with the block right after it
                if let Some(chain) = self.validate_chain(index, &head, size, restore)? {
                    return Ok(Some(chain));
                }
            }
        }
        Ok(None)
    }

    fn validate_chain(
        &mut self,
        start: u32,
        head: &Block,
        size: u16,
        restore: u16,
    ) -> Result<Option<DataChain>, FlashError> {
        if usize::from(size) > MAX_FILE_SIZE {
            warn!("jpfs: invalid size in block ({})", size);
            return Ok(None);
        }
        let end = start + blocks_needed(usize::from(size));
        if end > self.end {
            debug!("jpfs: chain at {} runs past the log end", start);
            return Ok(None);
        }

        let codec = self.logs.codec();
        let mut crc = 0;
        let mut block = *head;
        for index in start..end {
            if index > start {
                block = self.logs.load(self.log, index)?;
                if codec.decode(block.info()) != BlockKind::DataCont {
                    warn!("jpfs: unexpected block");
                    return Ok(None);
                }
            }
            if index + 1 < end {
                crc = crc32(crc, &block.0);
            } else if !block.crc_matches(crc) {
                warn!("jpfs: invalid CRC");
                return Ok(None);
            }
        }

        Ok(Some(DataChain {
            start,
            end,
            size,
            restore,
        }))
    }

    /// Last valid chain for `id` at or after `start`
    ///
    /// With `prune`, the start block of every superseded chain is tainted so
    /// later scans skip it.
    pub fn latest_data(
        &mut self,
        id: FileId,
        start: u32,
        prune: bool,
    ) -> Result<Option<DataChain>, FlashError> {
        let mut latest: Option<DataChain> = None;
        let mut from = start;
        while let Some(chain) = self.next_data(id, from)? {
            if let (true, Some(old)) = (prune, latest) {
                trace!("jpfs: pruning chain at {}", old.start);
                self.logs.taint_block(self.log, old.start)?;
            }
            from = chain.end;
            latest = Some(chain);
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Codec;
    use crate::config::Geometry;
    use jpfs_hal::{BitDefault, SimFlash};

    const UFID_A: Ufid = [0xA; 12];
    const UFID_B: Ufid = [0xB; 12];

    struct Fixture {
        logs: Logs<SimFlash<512>>,
        free: u32,
    }

    impl Fixture {
        fn new(bit_default: BitDefault) -> Self {
            let flash = SimFlash::new(bit_default, 1024);
            let mut logs = Logs::new(flash, &Geometry::new(0, 1024, 1024));
            logs.erase(LogIndex::A).unwrap();
            Self {
                logs,
                free: FIRST_BLOCK,
            }
        }

        fn codec(&self) -> Codec {
            self.logs.codec()
        }

        fn push(&mut self, block: Block) -> u32 {
            let index = self.free;
            self.logs.append(LogIndex::A, &mut self.free, &block).unwrap();
            index
        }

        fn entry(&mut self, id: u8, ufid: &Ufid) -> u32 {
            let block = Block::entry(self.codec(), FileId::new(id).unwrap(), ufid);
            self.push(block)
        }

        /// Single-block chain with `fill` as content
        fn short_chain(&mut self, id: u8, fill: u32) -> u32 {
            let mut block = Block([fill; 8]);
            block.0[0] = self.codec().data_start_info(FileId::new(id).unwrap(), 24, 0);
            block.0[7] = crc32(0, &block.0[..7]);
            self.push(block)
        }

        /// Two-block chain of 40 bytes
        fn long_chain(&mut self, id: u8) -> u32 {
            let codec = self.codec();
            let mut head = Block([0x1111_1111; 8]);
            head.0[0] = codec.data_start_info(FileId::new(id).unwrap(), 40, 0);
            let crc = crc32(0, &head.0);
            let mut tail = Block([0x2222_2222; 8]);
            tail.0[0] = codec.with_cont_tag(tail.0[0]);
            tail.0[7] = crc32(crc, &tail.0[..7]);
            let start = self.push(head);
            self.push(tail);
            start
        }

        fn scanner(&mut self) -> Scanner<'_, SimFlash<512>> {
            Scanner::new(&mut self.logs, LogIndex::A, self.free)
        }

        fn poke(&mut self, index: u32, word: u32, value: u32) {
            let addr = self.logs.block_addr(LogIndex::A, index) + word * 4;
            self.logs.flash_mut().poke(addr, value);
        }

        fn peek(&mut self, index: u32, word: u32) -> u32 {
            let addr = self.logs.block_addr(LogIndex::A, index) + word * 4;
            self.logs.flash_mut().peek(addr)
        }
    }

    fn id(n: u8) -> FileId {
        FileId::new(n).unwrap()
    }

    #[test]
    fn test_next_entry_skips_other_blocks() {
        let mut fx = Fixture::new(BitDefault::Ones);
        fx.short_chain(0, 5);
        let index = fx.entry(2, &UFID_A);

        let entry = fx.scanner().next_entry(FIRST_BLOCK).unwrap().unwrap();
        assert_eq!(entry.index, index);
        assert_eq!(entry.id, id(2));
        assert_eq!(entry.ufid, UFID_A);
        assert!(fx.scanner().next_entry(index + 1).unwrap().is_none());
    }

    #[test]
    fn test_next_entry_rejects_bad_crc() {
        let mut fx = Fixture::new(BitDefault::Ones);
        let bad = fx.entry(0, &UFID_A);
        let good = fx.entry(1, &UFID_B);
        let word = fx.peek(bad, 2);
        fx.poke(bad, 2, word ^ 0x100);

        let entry = fx.scanner().next_entry(FIRST_BLOCK).unwrap().unwrap();
        assert_eq!(entry.index, good);
    }

    #[test]
    fn test_find_entry_found_and_vacant() {
        let mut fx = Fixture::new(BitDefault::Zeros);
        fx.entry(0, &UFID_A);
        fx.entry(2, &UFID_B);

        assert_eq!(
            fx.scanner().find_entry(&UFID_B).unwrap(),
            EntryLookup::Found { id: id(2), index: 2 }
        );
        // lowest unused id, not the next one
        assert_eq!(
            fx.scanner().find_entry(&[0; 12]).unwrap(),
            EntryLookup::Vacant(Some(id(1)))
        );
    }

    #[test]
    fn test_find_entry_ignores_tainted() {
        let mut fx = Fixture::new(BitDefault::Ones);
        let index = fx.entry(0, &UFID_A);
        fx.logs.taint_block(LogIndex::A, index).unwrap();

        assert_eq!(
            fx.scanner().find_entry(&UFID_A).unwrap(),
            EntryLookup::Vacant(Some(id(0)))
        );
    }

    #[test]
    fn test_find_entry_all_ids_used() {
        let flash = SimFlash::<2048>::new(BitDefault::Ones, 1024);
        let mut logs = Logs::new(flash, &Geometry::new(0, 4096, 4096));
        logs.erase(LogIndex::A).unwrap();
        let codec = logs.codec();
        let mut free = FIRST_BLOCK;
        for n in 0..64u8 {
            let ufid = [n; 12];
            let block = Block::entry(codec, FileId::new(n).unwrap(), &ufid);
            logs.append(LogIndex::A, &mut free, &block).unwrap();
        }

        let mut scanner = Scanner::new(&mut logs, LogIndex::A, free);
        assert_eq!(
            scanner.find_entry(&[0xFF; 12]).unwrap(),
            EntryLookup::Vacant(None)
        );
        assert_eq!(
            scanner.find_entry(&[63; 12]).unwrap(),
            EntryLookup::Found { id: id(63), index: 64 }
        );
    }

    #[test]
    fn test_next_data_matches_id() {
        let mut fx = Fixture::new(BitDefault::Ones);
        fx.short_chain(1, 0);
        let start = fx.long_chain(3);

        let chain = fx.scanner().next_data(id(3), FIRST_BLOCK).unwrap().unwrap();
        assert_eq!(
            chain,
            DataChain {
                start,
                end: start + 2,
                size: 40,
                restore: 0
            }
        );
        assert!(fx.scanner().next_data(id(2), FIRST_BLOCK).unwrap().is_none());
    }

    #[test]
    fn test_next_data_rejects_bad_crc() {
        let mut fx = Fixture::new(BitDefault::Zeros);
        let start = fx.long_chain(0);
        let word = fx.peek(start + 1, 7);
        fx.poke(start + 1, 7, word ^ 1);
        assert!(fx.scanner().next_data(id(0), FIRST_BLOCK).unwrap().is_none());
    }

    #[test]
    fn test_next_data_rejects_oversized() {
        let mut fx = Fixture::new(BitDefault::Ones);
        let start = fx.short_chain(0, 0);
        let info = fx.codec().data_start_info(id(0), 505, 0);
        fx.poke(start, 0, info);
        assert!(fx.scanner().next_data(id(0), FIRST_BLOCK).unwrap().is_none());
    }

    #[test]
    fn test_next_data_truncated_by_free_pointer() {
        let mut fx = Fixture::new(BitDefault::Ones);
        let start = fx.long_chain(0);
        let mut scanner = Scanner::new(&mut fx.logs, LogIndex::A, start + 1);
        assert!(scanner.next_data(id(0), FIRST_BLOCK).unwrap().is_none());
    }

    #[test]
    fn test_interrupted_chain_does_not_hide_next_start() {
        let mut fx = Fixture::new(BitDefault::Ones);
        // start block of a 2-block chain whose continuation never made it
        let mut head = Block([0x3333_3333; 8]);
        head.0[0] = fx.codec().data_start_info(id(0), 40, 0);
        fx.push(head);
        let good = fx.short_chain(0, 9);

        let chain = fx.scanner().next_data(id(0), FIRST_BLOCK).unwrap().unwrap();
        assert_eq!(chain.start, good);
    }

    #[test]
    fn test_latest_data_wins() {
        let mut fx = Fixture::new(BitDefault::Ones);
        fx.short_chain(0, 1);
        fx.long_chain(0);
        let last = fx.short_chain(0, 3);

        let chain = fx.scanner().latest_data(id(0), FIRST_BLOCK, false).unwrap().unwrap();
        assert_eq!(chain.start, last);
    }

    #[test]
    fn test_latest_data_prunes_superseded() {
        let mut fx = Fixture::new(BitDefault::Ones);
        let first = fx.short_chain(0, 1);
        let second = fx.long_chain(0);
        let last = fx.short_chain(0, 3);

        let chain = fx.scanner().latest_data(id(0), FIRST_BLOCK, true).unwrap().unwrap();
        assert_eq!(chain.start, last);

        let codec = fx.codec();
        for index in [first, second] {
            let info = fx.peek(index, 0);
            assert_eq!(codec.decode(info), BlockKind::DataCont);
        }
        // the winner keeps its tag, so the next scan finds it first time
        let chain = fx.scanner().next_data(id(0), FIRST_BLOCK).unwrap().unwrap();
        assert_eq!(chain.start, last);
    }

    #[test]
    fn test_latest_data_none() {
        let mut fx = Fixture::new(BitDefault::Zeros);
        fx.entry(0, &UFID_A);
        assert!(fx.scanner().latest_data(id(0), FIRST_BLOCK, true).unwrap().is_none());
    }
}
