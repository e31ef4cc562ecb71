//! Savegame files: an XXTEA-encrypted GGDict blob, zero-padded to a fixed
//! minimum size, with an additive checksum footer.

use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use gg_crypt::xxtea;

use crate::ggdict::{self, Dictionary, Format};

const KEY: xxtea::Key = [0xAEA4_EDF3, 0xAFF8_332A, 0xB5A2_DBB4, 0x9B4B_A022];

const FOOTER_LEN: usize = 16;
const MIN_PAYLOAD_LEN: usize = 500_000;
const CHECKSUM_BASE: u32 = 0x0658_3463;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// The decrypted data is shorter than the footer.
    TooShort,
    /// The footer checksum does not match the data.
    ChecksumMismatch,
    Dict(ggdict::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::TooShort => write!(f, "savegame data is too short"),
            Error::ChecksumMismatch => write!(f, "invalid checksum for savegame data"),
            Error::Dict(e) => write!(f, "could not unmarshal savegame data: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Dict(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ggdict::Error> for Error {
    fn from(e: ggdict::Error) -> Self {
        Error::Dict(e)
    }
}

/// Reads a savegame in the classic GGDict format.
pub fn read(r: impl Read) -> Result<Dictionary, Error> {
    read_with_format(r, Format::THIMBLEWEED)
}

/// Reads a savegame with an explicit GGDict format variant.
pub fn read_with_format(mut r: impl Read, format: Format) -> Result<Dictionary, Error> {
    let mut data = Vec::new();
    r.read_to_end(&mut data)?;
    let decrypted = xxtea::decrypt(&data, KEY);
    if decrypted.len() < FOOTER_LEN {
        return Err(Error::TooShort);
    }
    let (payload, footer) = decrypted.split_at(decrypted.len() - FOOTER_LEN);
    if checksum(payload) != LittleEndian::read_u32(footer) {
        return Err(Error::ChecksumMismatch);
    }
    Ok(ggdict::unmarshal(payload, format)?)
}

/// Writes a savegame in the classic GGDict format.
pub fn write(w: impl Write, dict: &Dictionary) -> Result<(), Error> {
    write_with_format(w, dict, Format::THIMBLEWEED)
}

/// Writes a savegame with an explicit GGDict format variant.
pub fn write_with_format(
    mut w: impl Write,
    dict: &Dictionary,
    format: Format,
) -> Result<(), Error> {
    let mut data = ggdict::marshal(dict, format);
    zero_pad(&mut data, MIN_PAYLOAD_LEN);
    let mut footer = [0u8; FOOTER_LEN];
    LittleEndian::write_u32(&mut footer, checksum(&data));
    data.extend_from_slice(&footer);
    let encrypted = xxtea::encrypt(&data, KEY);
    w.write_all(&encrypted)?;
    Ok(())
}

/// Loads a savegame file in the classic GGDict format.
pub fn load(path: impl AsRef<Path>) -> Result<Dictionary, Error> {
    read(File::open(path)?)
}

/// Saves a savegame file in the classic GGDict format.
pub fn save(path: impl AsRef<Path>, dict: &Dictionary) -> Result<(), Error> {
    write(File::create(path)?, dict)
}

fn zero_pad(data: &mut Vec<u8>, min_len: usize) {
    if data.len() < min_len {
        data.resize(min_len, 0);
    }
}

fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(CHECKSUM_BASE, |sum, &b| sum.wrapping_add(b as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ggdict::Value;

    #[test]
    fn test_zero_pad() {
        let cases: &[(&[u8], usize, &[u8])] = &[
            (b"", 5, b"\x00\x00\x00\x00\x00"),
            (b"a", 5, b"a\x00\x00\x00\x00"),
            (b"ab", 5, b"ab\x00\x00\x00"),
            (b"abc", 5, b"abc\x00\x00"),
            (b"hello", 10, b"hello\x00\x00\x00\x00\x00"),
            (b"hello, world", 10, b"hello, world"),
        ];
        for (data, min_len, want) in cases {
            let mut padded = data.to_vec();
            zero_pad(&mut padded, *min_len);
            assert_eq!(&padded, want);
        }
    }

    #[test]
    fn test_checksum() {
        let cases: &[(&[u8], u32)] = &[
            (b"", 0x0658_3463),
            (b"a", 0x0658_34C4),
            (b"ab", 0x0658_3526),
            (b"abc", 0x0658_3589),
            (b"hello, world", 0x0658_38EB),
        ];
        for (data, want) in cases {
            assert_eq!(checksum(data), *want, "checksum of {:?}", data);
        }
    }

    #[test]
    fn test_round_trip() {
        let dict = Dictionary::from([
            ("version".to_owned(), Value::Integer(2)),
            ("savebuild".to_owned(), Value::Integer(944)),
            ("gameScene".to_owned(), Value::from("Bridge")),
            (
                "inventory".to_owned(),
                Value::Array(vec![Value::from("note"), Value::from("balloon_animal")]),
            ),
        ]);
        let mut encrypted = Vec::new();
        write(&mut encrypted, &dict).unwrap();
        assert!(encrypted.len() >= MIN_PAYLOAD_LEN + FOOTER_LEN);
        assert_eq!(read(&encrypted[..]).unwrap(), dict);
    }

    #[test]
    fn test_corrupted_byte_fails_checksum() {
        let dict = Dictionary::from([("a".to_owned(), Value::Integer(1))]);
        let mut encrypted = Vec::new();
        write(&mut encrypted, &dict).unwrap();
        for index in [0, 100, 250_000, encrypted.len() - 1] {
            let mut corrupted = encrypted.clone();
            corrupted[index] ^= 0x01;
            match read(&corrupted[..]) {
                Err(Error::ChecksumMismatch) => (),
                // A flipped bit may also surface as a dict decode error if
                // it lands in the footer checksum itself; never as success.
                Err(_) => (),
                Ok(_) => panic!("corruption at {} went unnoticed", index),
            }
        }
    }

    #[test]
    fn test_too_short() {
        match read(&b"abc"[..]) {
            Err(Error::TooShort) => (),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
