//! The "unbreakable" XOR encryption used for ggpack containers.

use std::error;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::monkey::{self, MonkeyCipher, MonkeyKey};
use crate::transform::{TransformReader, TransformWriter, Transformer};

/// A classic XOR key: a run of magic bytes plus a cursor multiplier.
///
/// The cipher XORs each plaintext byte with a rolling sum of previous
/// plaintext bytes, then with `magic[cursor & 0x0F]` and the byte-wise
/// product of the cursor and the multiplier. The rolling sum is seeded
/// from the declared plaintext length, so the same declared size must be
/// used for encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub magic_bytes: &'static [u8],
    pub multiplier: u8,
}

const MAGIC_5B: &[u8] = &[
    0x4F, 0xD0, 0xA0, 0xAC, 0x4A, 0x5B, 0xB9, 0xE5,
    0x93, 0x79, 0x45, 0xA5, 0xC1, 0xCB, 0x31, 0x93,
];

const MAGIC_56: &[u8] = &[
    0x4F, 0xD0, 0xA0, 0xAC, 0x4A, 0x56, 0xB9, 0xE5,
    0x93, 0x79, 0x45, 0xA5, 0xC1, 0xCB, 0x31, 0x93,
];

const MAGIC_DELORES: &[u8] = &[
    0x3F, 0x41, 0x41, 0x60, 0x95, 0x87, 0x4A, 0xE6,
    0x34, 0xC6, 0x3A, 0x86, 0x29, 0x27, 0x77, 0x8D,
    0x38, 0xB4, 0x96, 0xC9, 0x38, 0xB4, 0x96, 0xC9,
    0x00, 0xE0, 0x0A, 0xC6, 0x00, 0xE0, 0x0A, 0xC6,
    0x00, 0x3C, 0x1C, 0xC6, 0x00, 0x3C, 0x1C, 0xC6,
    0x00, 0xE4, 0x40, 0xC6, 0x00, 0xE4, 0x40, 0xC6,
];

impl Key {
    /// The key used by Thimbleweed Park. This is the default pack key.
    pub fn thimbleweed() -> Key {
        Key { magic_bytes: MAGIC_56, multiplier: 0xAD }
    }

    /// Legacy variant "5b6d".
    pub fn legacy_5b6d() -> Key {
        Key { magic_bytes: MAGIC_5B, multiplier: 0x6D }
    }

    /// Legacy variant "566d".
    pub fn legacy_566d() -> Key {
        Key { magic_bytes: MAGIC_56, multiplier: 0x6D }
    }

    /// Legacy variant "5bad".
    pub fn legacy_5bad() -> Key {
        Key { magic_bytes: MAGIC_5B, multiplier: 0xAD }
    }

    /// The key used by Delores.
    pub fn delores() -> Key {
        Key { magic_bytes: MAGIC_DELORES, multiplier: 0x6D }
    }

    pub fn decoder(&self, expected_size: u64) -> Decoder {
        Decoder { key: *self, cursor: 0, xor_sum: expected_size as u8 }
    }

    pub fn encoder(&self, expected_size: u64) -> Encoder {
        Encoder { key: *self, cursor: 0, xor_sum: expected_size as u8 }
    }

    pub fn decoding_reader<R: Read>(&self, r: R, expected_size: u64) -> TransformReader<R, Decoder> {
        TransformReader::new(r, self.decoder(expected_size))
    }

    pub fn encoding_writer<W: Write>(&self, w: W, expected_size: u64) -> TransformWriter<W, Encoder> {
        TransformWriter::new(w, self.encoder(expected_size))
    }
}

pub struct Decoder {
    key: Key,
    cursor: u8,
    xor_sum: u8,
}

impl Transformer for Decoder {
    fn transform(&mut self, data: &mut [u8]) {
        for b in data {
            let x = *b
                ^ self.key.magic_bytes[(self.cursor & 0x0F) as usize]
                ^ self.cursor.wrapping_mul(self.key.multiplier);
            *b = x ^ self.xor_sum;
            self.xor_sum = x;
            self.cursor = self.cursor.wrapping_add(1);
        }
    }
}

pub struct Encoder {
    key: Key,
    cursor: u8,
    xor_sum: u8,
}

impl Transformer for Encoder {
    fn transform(&mut self, data: &mut [u8]) {
        for b in data {
            let x = *b ^ self.xor_sum;
            *b = x
                ^ self.key.magic_bytes[(self.cursor & 0x0F) as usize]
                ^ self.cursor.wrapping_mul(self.key.multiplier);
            self.xor_sum = x;
            self.cursor = self.cursor.wrapping_add(1);
        }
    }
}

/// A monkey key was used before its tables were discovered with
/// [`XorKey::load_from`].
#[derive(Debug, PartialEq, Eq)]
pub struct KeyNotLoaded;

impl fmt::Display for KeyNotLoaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XOR key tables have not been loaded yet")
    }
}

impl error::Error for KeyNotLoaded {}

/// Any of the known pack ciphers, with uniform encode/decode operations.
pub enum XorKey {
    Classic(Key),
    Monkey(MonkeyKey),
}

/// One cipher direction of an [`XorKey`], usable as a [`Transformer`].
pub enum XorCipher<'a> {
    Classic(ClassicCipher),
    Monkey(MonkeyCipher<'a>),
}

pub enum ClassicCipher {
    Decode(Decoder),
    Encode(Encoder),
}

impl Transformer for XorCipher<'_> {
    fn transform(&mut self, data: &mut [u8]) {
        match self {
            XorCipher::Classic(ClassicCipher::Decode(t)) => t.transform(data),
            XorCipher::Classic(ClassicCipher::Encode(t)) => t.transform(data),
            XorCipher::Monkey(t) => t.transform(data),
        }
    }
}

impl XorKey {
    /// Looks up a key by its registry name. Known names are
    /// `"thimbleweed"` (the default), the legacy variants `"5b6d"`,
    /// `"566d"` and `"5bad"`, `"delores"` and `"monkey"`.
    ///
    /// The monkey key starts out unloaded; call [`XorKey::load_from`]
    /// with the game executable before using it.
    pub fn known(name: &str) -> Option<XorKey> {
        match name {
            "thimbleweed" => Some(XorKey::Classic(Key::thimbleweed())),
            "5b6d" => Some(XorKey::Classic(Key::legacy_5b6d())),
            "566d" => Some(XorKey::Classic(Key::legacy_566d())),
            "5bad" => Some(XorKey::Classic(Key::legacy_5bad())),
            "delores" => Some(XorKey::Classic(Key::delores())),
            "monkey" => Some(XorKey::Monkey(MonkeyKey::new())),
            _ => None,
        }
    }

    /// True while the key's tables still have to be discovered.
    pub fn needs_loading(&self) -> bool {
        match self {
            XorKey::Classic(_) => false,
            XorKey::Monkey(key) => key.needs_loading(),
        }
    }

    /// Discovers key tables by scanning a game executable. Classic keys
    /// carry their tables inline and reject loading.
    pub fn load_from(&mut self, exec_file: &Path) -> Result<(), monkey::LoadError> {
        match self {
            XorKey::Classic(_) => Err(monkey::LoadError::NotLoadable),
            XorKey::Monkey(key) => key.load_from(exec_file),
        }
    }

    /// True if containers encrypted with this key store 16-bit string
    /// table indices in their directory dictionaries.
    pub fn uses_short_indices(&self) -> bool {
        matches!(self, XorKey::Monkey(_))
    }

    pub fn decoder(&self, expected_size: u64) -> Result<XorCipher<'_>, KeyNotLoaded> {
        match self {
            XorKey::Classic(key) => {
                Ok(XorCipher::Classic(ClassicCipher::Decode(key.decoder(expected_size))))
            }
            XorKey::Monkey(key) => Ok(XorCipher::Monkey(key.cipher(expected_size)?)),
        }
    }

    pub fn encoder(&self, expected_size: u64) -> Result<XorCipher<'_>, KeyNotLoaded> {
        match self {
            XorKey::Classic(key) => {
                Ok(XorCipher::Classic(ClassicCipher::Encode(key.encoder(expected_size))))
            }
            XorKey::Monkey(key) => Ok(XorCipher::Monkey(key.cipher(expected_size)?)),
        }
    }
}

impl Default for XorKey {
    fn default() -> Self {
        XorKey::Classic(Key::thimbleweed())
    }
}
