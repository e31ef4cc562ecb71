//! Reading and writing ggpack container files.
//!
//! A pack is a tiny header (directory offset and size), the encrypted
//! entry bodies, and an encrypted GGDict directory listing
//! `{filename, offset, size}` per entry.

mod packer;

pub use packer::Packer;

use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use gg_crypt::bnut;
use gg_crypt::transform::TransformReader;
use gg_crypt::xor::{KeyNotLoaded, XorKey};

use crate::ggdict::{self, Format, Value};

const BNUT_EXT: &str = ".bnut";
const BANK_EXT: &str = ".bank";

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// The directory GGDict could not be decoded.
    Directory(ggdict::Error),
    /// The directory decoded, but does not have the expected shape.
    MalformedDirectory(&'static str),
    /// The pack key requires loading before use.
    KeyNotLoaded,
    /// No entry with this name exists in the pack.
    NotFound(String),
    /// The name is not a valid single-component entry name.
    InvalidPath(String),
    /// An entry body ended before its declared size.
    SizeMismatch { expected: u64, actual: u64 },
    /// The packer was used after `finish`.
    Finished,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Directory(e) => write!(f, "could not read pack directory: {}", e),
            Error::MalformedDirectory(what) => {
                write!(f, "malformed pack directory: {}", what)
            }
            Error::KeyNotLoaded => write!(f, "pack key tables have not been loaded yet"),
            Error::NotFound(name) => write!(f, "no such file in pack: {:?}", name),
            Error::InvalidPath(name) => write!(f, "invalid pack entry name: {:?}", name),
            Error::SizeMismatch { expected, actual } => {
                write!(f, "entry size mismatch: declared {}, got {}", expected, actual)
            }
            Error::Finished => write!(f, "pack is already finished"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Directory(e) => Some(e),
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
        Error::Directory(e)
    }
}

impl From<KeyNotLoaded> for Error {
    fn from(_: KeyNotLoaded) -> Self {
        Error::KeyNotLoaded
    }
}

/// A directory entry: where an encrypted body lives in the pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub offset: u64,
    pub size: u64,
}

/// Read access to the contents of a ggpack file.
///
/// The directory is built once at open time and stays immutable. Entry
/// readers seek the shared source, so only one can be in use at a time;
/// this is enforced by the mutable borrow they hold on the pack.
pub struct Pack<R> {
    source: R,
    key: XorKey,
    directory: BTreeMap<String, Entry>,
}

impl Pack<File> {
    /// Opens a pack file with the default key.
    pub fn open(path: impl AsRef<Path>) -> Result<Pack<File>, Error> {
        Pack::open_with_key(path, XorKey::default())
    }

    /// Opens a pack file with the given key. The key must already be
    /// loaded if it needs loading.
    pub fn open_with_key(path: impl AsRef<Path>, key: XorKey) -> Result<Pack<File>, Error> {
        Pack::new(File::open(path)?, key)
    }
}

impl<R: Read + Seek> Pack<R> {
    /// Opens a pack over any seekable byte source.
    pub fn new(mut source: R, key: XorKey) -> Result<Pack<R>, Error> {
        if key.needs_loading() {
            return Err(Error::KeyNotLoaded);
        }
        let directory_entry = read_directory_entry(&mut source)?;
        let buf = read_entry_raw(&mut source, &key, directory_entry)?;
        let directory = read_directory(&buf, directory_format(&key))?;
        Ok(Pack { source, key, directory })
    }

    /// The directory, sorted by filename.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Entry)> {
        self.directory.iter().map(|(name, &entry)| (name.as_str(), entry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directory.contains_key(name)
    }

    /// Looks up an entry's declared location and size.
    pub fn stat(&self, name: &str) -> Option<Entry> {
        self.directory.get(name).copied()
    }

    /// Opens an entry for sequential reading. Decryption is stateful, so
    /// the returned reader cannot seek; read it in order and drop it
    /// before opening another entry.
    pub fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>, Error> {
        if !is_valid_entry_name(name) {
            return Err(Error::InvalidPath(name.to_owned()));
        }
        let entry = *self.directory.get(name).ok_or_else(|| Error::NotFound(name.to_owned()))?;
        self.source.seek(SeekFrom::Start(entry.offset))?;
        let limited = (&mut self.source).take(entry.size);
        // FMOD .bank assets are stored without the XOR layer.
        if name.ends_with(BANK_EXT) {
            return Ok(Box::new(limited));
        }
        let decoded = TransformReader::new(limited, self.key.decoder(entry.size)?);
        if name.ends_with(BNUT_EXT) {
            return Ok(Box::new(TransformReader::new(decoded, bnut::Cipher::new(entry.size))));
        }
        Ok(Box::new(decoded))
    }

    /// Reads a whole entry into memory.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        let expected = self.stat(name).map(|e| e.size);
        let mut r = self.open_entry(name)?;
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        drop(r);
        if let Some(expected) = expected {
            if buf.len() as u64 != expected {
                return Err(Error::SizeMismatch { expected, actual: buf.len() as u64 });
            }
        }
        Ok(buf)
    }

    /// Releases the pack and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

pub(crate) fn directory_format(key: &XorKey) -> Format {
    if key.uses_short_indices() {
        Format::MONKEY
    } else {
        Format::THIMBLEWEED
    }
}

pub(crate) fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

fn read_directory_entry<R: Read>(source: &mut R) -> Result<Entry, Error> {
    let offset = source.read_u32::<LittleEndian>()?;
    let size = source.read_u32::<LittleEndian>()?;
    Ok(Entry { offset: offset as u64, size: size as u64 })
}

fn read_entry_raw<R: Read + Seek>(
    source: &mut R,
    key: &XorKey,
    entry: Entry,
) -> Result<Vec<u8>, Error> {
    source.seek(SeekFrom::Start(entry.offset))?;
    let limited = source.take(entry.size);
    let mut decoded = TransformReader::new(limited, key.decoder(entry.size)?);
    let mut buf = Vec::with_capacity(entry.size as usize);
    decoded.read_to_end(&mut buf)?;
    if buf.len() as u64 != entry.size {
        return Err(Error::SizeMismatch { expected: entry.size, actual: buf.len() as u64 });
    }
    Ok(buf)
}

const KEY_FILES: &str = "files";
const KEY_FILENAME: &str = "filename";
const KEY_OFFSET: &str = "offset";
const KEY_SIZE: &str = "size";

fn read_directory(buf: &[u8], format: Format) -> Result<BTreeMap<String, Entry>, Error> {
    let dict = ggdict::unmarshal(buf, format)?;
    let files = match dict.get(KEY_FILES) {
        Some(Value::Array(files)) => files,
        _ => return Err(Error::MalformedDirectory("\"files\" is not an array")),
    };
    let mut directory = BTreeMap::new();
    for file in files {
        let entry = match file {
            Value::Dictionary(entry) => entry,
            _ => return Err(Error::MalformedDirectory("file entry is not a dictionary")),
        };
        let filename = match entry.get(KEY_FILENAME) {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(Error::MalformedDirectory("\"filename\" is not a string")),
        };
        let offset = match entry.get(KEY_OFFSET) {
            Some(&Value::Integer(offset)) if offset >= 0 => offset as u64,
            _ => return Err(Error::MalformedDirectory("\"offset\" is not an integer")),
        };
        let size = match entry.get(KEY_SIZE) {
            Some(&Value::Integer(size)) if size >= 0 => size as u64,
            _ => return Err(Error::MalformedDirectory("\"size\" is not an integer")),
        };
        directory.insert(filename, Entry { offset, size });
    }
    Ok(directory)
}
