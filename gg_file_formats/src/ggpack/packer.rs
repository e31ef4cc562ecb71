use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use gg_crypt::bnut;
use gg_crypt::transform::TransformWriter;
use gg_crypt::xor::XorKey;

use super::{directory_format, is_valid_entry_name, Error, BANK_EXT, BNUT_EXT};
use crate::ggdict::{self, Dictionary, Value};

/// Streams files into a new ggpack container.
///
/// Eight header bytes are reserved up front; each entry body is encoded
/// and appended, and `finish` writes the encrypted directory and patches
/// the header with its offset and size.
pub struct Packer<W> {
    writer: W,
    offset: u64,
    key: XorKey,
    files: Vec<(String, u64, u64)>,
    finished: bool,
}

impl<W: Write + Seek> Packer<W> {
    pub fn new(mut writer: W, key: XorKey) -> Result<Packer<W>, Error> {
        if key.needs_loading() {
            return Err(Error::KeyNotLoaded);
        }
        writer.write_all(&[0u8; 8])?;
        Ok(Packer { writer, offset: 8, key, files: Vec::new(), finished: false })
    }

    /// Appends one entry with the given name, reading exactly `size`
    /// bytes from `source`.
    pub fn write_entry(
        &mut self,
        name: &str,
        source: impl Read,
        size: u64,
    ) -> Result<(), Error> {
        if self.finished {
            return Err(Error::Finished);
        }
        if !is_valid_entry_name(name) {
            return Err(Error::InvalidPath(name.to_owned()));
        }

        let entry_offset = self.offset;
        // FMOD .bank assets are stored without the XOR layer.
        let copied = if name.ends_with(BANK_EXT) {
            io::copy(&mut source.take(size), &mut self.writer)?
        } else {
            let encoder = self.key.encoder(size)?;
            let xored = TransformWriter::new(&mut self.writer, encoder);
            if name.ends_with(BNUT_EXT) {
                let mut layered = TransformWriter::new(xored, bnut::Cipher::new(size));
                io::copy(&mut source.take(size), &mut layered)?
            } else {
                let mut layered = xored;
                io::copy(&mut source.take(size), &mut layered)?
            }
        };
        self.offset += copied;
        if copied != size {
            return Err(Error::SizeMismatch { expected: size, actual: copied });
        }

        self.files.push((name.to_owned(), entry_offset, size));
        Ok(())
    }

    /// Appends a file from disk under its base name.
    pub fn write_path(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidPath(path.to_string_lossy().into_owned()))?
            .to_owned();
        self.write_path_as(&name, path)
    }

    /// Appends a file from disk under the given entry name.
    pub fn write_path_as(&mut self, name: &str, path: impl AsRef<Path>) -> Result<(), Error> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        self.write_entry(name, file, size)
    }

    /// Writes the directory and the header. No further writes are
    /// possible afterwards.
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.finished {
            return Err(Error::Finished);
        }

        let files: Vec<Value> = self
            .files
            .iter()
            .map(|(name, offset, size)| {
                Value::Dictionary(Dictionary::from([
                    ("filename".to_owned(), Value::String(name.clone())),
                    ("offset".to_owned(), Value::Integer(*offset as i64)),
                    ("size".to_owned(), Value::Integer(*size as i64)),
                ]))
            })
            .collect();
        let directory = Dictionary::from([("files".to_owned(), Value::Array(files))]);

        let dir_offset = self.offset;
        let data = ggdict::marshal(&directory, directory_format(&self.key));
        let dir_size = data.len() as u64;
        let encoder = self.key.encoder(dir_size)?;
        let mut w = TransformWriter::new(&mut self.writer, encoder);
        w.write_all(&data)?;
        self.offset += dir_size;
        self.finished = true;

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_u32::<LittleEndian>(dir_offset as u32)?;
        self.writer.write_u32::<LittleEndian>(dir_size as u32)?;
        self.writer.flush()?;
        Ok(())
    }
}
