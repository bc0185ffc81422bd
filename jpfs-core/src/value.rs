//! Typed values
//!
//! Stores any `serde` type as a file in postcard binary format. Handy for
//! calibration tables and settings that would otherwise need a hand-written
//! byte layout.

use jpfs_hal::WordFlash;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::block::{Ufid, MAX_FILE_SIZE};
use crate::error::JpfsError;
use crate::manager::Jpfs;

impl<F: WordFlash> Jpfs<F> {
    /// Serialize `value` and save it as the content of `ufid`
    pub fn save_value<T: Serialize>(&mut self, ufid: &Ufid, value: &T) -> Result<(), JpfsError> {
        let mut buffer = [0u8; MAX_FILE_SIZE];
        let bytes = postcard::to_slice(value, &mut buffer).map_err(|e| match e {
            postcard::Error::SerializeBufferFull => JpfsError::TooLarge,
            _ => JpfsError::Encoding,
        })?;
        debug!("jpfs: saving value of {} bytes", bytes.len());
        self.save(ufid, bytes)
    }

    /// Load and deserialize the content of `ufid`
    pub fn load_value<T: DeserializeOwned>(&mut self, ufid: &Ufid) -> Result<T, JpfsError> {
        let mut buffer = [0u8; MAX_FILE_SIZE];
        let len = self.read(ufid, &mut buffer)?;
        postcard::from_bytes(&buffer[..len]).map_err(|_| JpfsError::Encoding)
    }
}
