//! Shared fixtures for the unit tests

use jpfs_hal::{BitDefault, SimFlash, WordFlash};

use crate::block::Ufid;
use crate::config::Geometry;
use crate::error::JpfsError;
use crate::manager::Jpfs;

pub const PAGE_SIZE: u32 = 4096;

/// Two 4 KB logs, 127 usable blocks each
pub type TestFlash = SimFlash<2048>;
pub const GEOMETRY: Geometry = Geometry::new(0, 4096, 4096);

/// Two 8 KB logs, enough for all 64 ids
pub type BigFlash = SimFlash<4096>;
pub const BIG_GEOMETRY: Geometry = Geometry::new(0, 8192, 8192);

pub const UFID_TEST1: Ufid = [
    0x70, 0x3f, 0x45, 0xef, 0xbc, 0x46, 0x7e, 0x17, 0xbc, 0x5b, 0x75, 0x76,
];

pub const LOREM_IPSUM: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim \
veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

pub const LOREM_IPSUM2: &[u8] = b"Duis aute irure dolor in reprehenderit in voluptate velit \
esse cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, \
sunt in culpa qui officia deserunt mollit anim id est laborum.";

/// Fresh store on a never-erased simulator
pub fn mount(bit_default: BitDefault) -> Jpfs<TestFlash> {
    Jpfs::init(TestFlash::new(bit_default, PAGE_SIZE), GEOMETRY).unwrap()
}

pub fn mount_big(bit_default: BitDefault) -> Jpfs<BigFlash> {
    Jpfs::init(BigFlash::new(bit_default, PAGE_SIZE), BIG_GEOMETRY).unwrap()
}

/// Unmount and mount again, as after a reset
pub fn remount(fs: Jpfs<TestFlash>) -> Jpfs<TestFlash> {
    Jpfs::init(fs.into_inner(), GEOMETRY).unwrap()
}

/// Distinct UFID per number, never equal to [`UFID_TEST1`]
pub fn ufid(n: u32) -> Ufid {
    let mut ufid = [0x5a; 12];
    ufid[..4].copy_from_slice(&n.to_le_bytes());
    ufid
}

pub fn read_all<F: WordFlash>(fs: &mut Jpfs<F>, ufid: &Ufid) -> Result<Vec<u8>, JpfsError> {
    let mut buf = vec![0u8; fs.size(ufid)?];
    fs.read(ufid, &mut buf)?;
    Ok(buf)
}

/// Rewrite one word of a block in the active log, bypassing the medium rules
pub fn poke<const N: usize>(
    fs: &mut Jpfs<SimFlash<N>>,
    index: u32,
    word: u32,
    f: impl FnOnce(u32) -> u32,
) {
    let addr = fs.logs.block_addr(fs.active, index) + word * 4;
    let flash = fs.logs.flash_mut();
    let value = f(flash.peek(addr));
    flash.poke(addr, value);
}

/// Deterministic xorshift generator for workload tests
pub struct XorShift32(u32);

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        Self(if seed == 0 { crate::block::LOG_MAGIC } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}
