//! The two-table XOR cipher of Return to Monkey Island.
//!
//! The key tables are not shipped with the game data; they are located
//! inside the game executable by scanning for byte windows with known MD5
//! fingerprints.

use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::transform::Transformer;
use crate::xor::KeyNotLoaded;

const SHORT_TABLE_LEN: usize = 256;
const LONG_TABLE_LEN: usize = 65536;

const SHORT_TABLE_FIRST_BYTE: u8 = 0xD5;
const LONG_TABLE_FIRST_BYTE: u8 = 0xF7;

const SHORT_TABLE_MD5: [u8; 16] = [
    0xB1, 0x90, 0xC4, 0x21, 0xFE, 0x7F, 0xEA, 0xFC,
    0x77, 0xC5, 0x17, 0xA2, 0x32, 0xAB, 0xBB, 0x4C,
];

const LONG_TABLE_MD5: [u8; 16] = [
    0x7F, 0xAA, 0xF6, 0x57, 0x4F, 0x27, 0xEB, 0xD9,
    0xD2, 0x74, 0x4C, 0xC6, 0x8E, 0x41, 0x15, 0xC8,
];

const MODIFIER: u8 = 0x78;

/// Key table discovery failed.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    /// One or both key tables could not be found in the scanned file.
    TablesNotFound,
    /// The key carries its tables inline and cannot be loaded.
    NotLoadable,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "could not read executable: {}", e),
            LoadError::TablesNotFound => write!(f, "one or both key tables could not be found"),
            LoadError::NotLoadable => write!(f, "this key does not need to be loaded"),
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// The Return to Monkey Island XOR key: a short (256 byte) and a long
/// (65536 byte) table plus an 8-bit modifier.
pub struct MonkeyKey {
    short_table: Option<Vec<u8>>,
    long_table: Option<Vec<u8>>,
    modifier: u8,
}

impl MonkeyKey {
    /// A key with the well-known modifier and no tables yet.
    pub fn new() -> MonkeyKey {
        MonkeyKey { short_table: None, long_table: None, modifier: MODIFIER }
    }

    /// A key with explicitly supplied tables. Table lengths must be 256
    /// and 65536 bytes.
    pub fn with_tables(short_table: Vec<u8>, long_table: Vec<u8>, modifier: u8) -> MonkeyKey {
        assert_eq!(short_table.len(), SHORT_TABLE_LEN);
        assert_eq!(long_table.len(), LONG_TABLE_LEN);
        MonkeyKey { short_table: Some(short_table), long_table: Some(long_table), modifier }
    }

    pub fn needs_loading(&self) -> bool {
        self.short_table.is_none() || self.long_table.is_none()
    }

    /// Scans the game executable for the key tables.
    pub fn load_from(&mut self, exec_file: &Path) -> Result<(), LoadError> {
        let data = fs::read(exec_file)?;
        self.short_table =
            find_table(&data, SHORT_TABLE_LEN, SHORT_TABLE_FIRST_BYTE, &SHORT_TABLE_MD5);
        self.long_table = find_table(&data, LONG_TABLE_LEN, LONG_TABLE_FIRST_BYTE, &LONG_TABLE_MD5);
        if self.needs_loading() {
            return Err(LoadError::TablesNotFound);
        }
        Ok(())
    }

    pub fn cipher(&self, expected_size: u64) -> Result<MonkeyCipher<'_>, KeyNotLoaded> {
        match (&self.short_table, &self.long_table) {
            (Some(short_table), Some(long_table)) => Ok(MonkeyCipher {
                short_table,
                long_table,
                modifier: self.modifier,
                cursor: (expected_size as u16).wrapping_add(self.modifier as u16),
            }),
            _ => Err(KeyNotLoaded),
        }
    }
}

impl Default for MonkeyKey {
    fn default() -> Self {
        MonkeyKey::new()
    }
}

fn find_table(data: &[u8], len: usize, first_byte: u8, md5sum: &[u8; 16]) -> Option<Vec<u8>> {
    if data.len() < len {
        return None;
    }
    for start in 0..data.len() - len {
        let window = &data[start..start + len];
        if window[0] == first_byte && md5::compute(window).0 == *md5sum {
            return Some(window.to_vec());
        }
    }
    None
}

/// The cipher is a pure stream cipher; encoding and decoding are the same
/// operation.
pub struct MonkeyCipher<'a> {
    short_table: &'a [u8],
    long_table: &'a [u8],
    modifier: u8,
    cursor: u16,
}

impl Transformer for MonkeyCipher<'_> {
    fn transform(&mut self, data: &mut [u8]) {
        for b in data {
            let lo = self.cursor as u8;
            *b ^= self.short_table[lo.wrapping_add(self.modifier) as usize]
                ^ self.long_table[self.cursor as usize];
            self.cursor = self.cursor.wrapping_add(self.short_table[lo as usize] as u16);
        }
    }
}
