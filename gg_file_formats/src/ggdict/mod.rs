//! The GGDictionary binary format: a JSON-like tree of dictionaries,
//! arrays, strings and numbers, serialized with a shared interned string
//! table referenced by offsets.

mod marshal;
mod unmarshal;

pub use marshal::marshal;
pub use unmarshal::unmarshal;

use std::collections::BTreeMap;
use std::error;
use std::fmt;

/// The root of every GGDict is a dictionary. Iteration order is the key
/// order serializers emit.
pub type Dictionary = BTreeMap<String, Value>;

/// A value in a GGDict tree.
///
/// Integers and floats are stored as their textual form in the string
/// table; the coordinate variants only occur in the monkey format and are
/// opaque strings at this layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Dictionary(Dictionary),
    Array(Vec<Value>),
    String(String),
    Integer(i64),
    Float(f64),
    Coordinate(String),
    CoordinatePair(String),
    CoordinateList(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// The two format variants found in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// String table indices are 16-bit instead of 32-bit.
    pub short_string_indices: bool,
    /// The coordinate value types are allowed.
    pub coordinate_types: bool,
}

impl Format {
    /// The format found in Thimbleweed Park and Delores.
    pub const THIMBLEWEED: Format = Format { short_string_indices: false, coordinate_types: false };

    /// The format found in Return to Monkey Island.
    pub const MONKEY: Format = Format { short_string_indices: true, coordinate_types: true };
}

pub(crate) const FORMAT_SIGNATURE: u32 = 0x0403_0201;

pub(crate) const TYPE_NULL: u8 = 0x01;
pub(crate) const TYPE_DICTIONARY: u8 = 0x02;
pub(crate) const TYPE_ARRAY: u8 = 0x03;
pub(crate) const TYPE_STRING: u8 = 0x04;
pub(crate) const TYPE_INTEGER: u8 = 0x05;
pub(crate) const TYPE_FLOAT: u8 = 0x06;
pub(crate) const TYPE_OFFSETS: u8 = 0x07;
pub(crate) const TYPE_STRINGS: u8 = 0x08;
pub(crate) const TYPE_COORDINATE: u8 = 0x09;
pub(crate) const TYPE_COORDINATE_PAIR: u8 = 0x0A;
pub(crate) const TYPE_COORDINATE_LIST: u8 = 0x0B;

pub(crate) const OFFSETS_TERMINATOR: u32 = 0xFFFF_FFFF;

/// Reasons a GGDict cannot be decoded.
#[derive(Debug)]
pub enum Error {
    /// The header does not start with the format signature.
    Signature(u32),
    /// A type marker not defined by the format (or not allowed by the
    /// chosen format variant) was encountered.
    UnknownType(u8),
    /// A dictionary is missing its closing marker.
    UnterminatedDictionary,
    /// An array is missing its closing marker.
    UnterminatedArray,
    /// The root value is not a dictionary.
    RootNotDictionary,
    /// The string offsets section is missing or malformed.
    BadOffsetIndex,
    /// A string table index points past the end of the offsets section.
    StringIndexOutOfRange { index: usize, len: usize },
    /// The data ended before an expected value.
    Truncated,
    /// An integer leaf holds text that does not parse as an integer.
    InvalidInteger(String),
    /// A float leaf holds text that does not parse as a float.
    InvalidFloat(String),
    /// A string in the pool is not valid UTF-8.
    InvalidUtf8,
    /// Context wrapper naming the dictionary key or array element the
    /// nested error occurred in.
    Context { what: String, source: Box<Error> },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Signature(sig) => write!(f, "invalid format signature: {:#x}", sig),
            Error::UnknownType(marker) => write!(f, "unknown value type: {}", marker),
            Error::UnterminatedDictionary => write!(f, "unterminated dictionary"),
            Error::UnterminatedArray => write!(f, "unterminated array"),
            Error::RootNotDictionary => write!(f, "root is not a dictionary"),
            Error::BadOffsetIndex => write!(f, "could not read string offset index"),
            Error::StringIndexOutOfRange { index, len } => {
                write!(f, "string index {} out of range ({} table entries)", index, len)
            }
            Error::Truncated => write!(f, "premature end of data"),
            Error::InvalidInteger(s) => write!(f, "invalid integer literal: {:?}", s),
            Error::InvalidFloat(s) => write!(f, "invalid float literal: {:?}", s),
            Error::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Error::Context { what, source } => write!(f, "{}: {}", what, source),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dict = Dictionary::from([
            ("name".to_owned(), Value::from("Test")),
            ("count".to_owned(), Value::from(4)),
            (
                "numbers".to_owned(),
                Value::Array(vec![
                    Value::from(0.5),
                    Value::from(3),
                    Value::from(2.6),
                    Value::from(1.4),
                ]),
            ),
            (
                "subobject".to_owned(),
                Value::Dictionary(Dictionary::from([
                    ("title".to_owned(), Value::from("Test 2")),
                    ("id".to_owned(), Value::from(0)),
                ])),
            ),
            ("nothing".to_owned(), Value::Null),
        ]);
        for format in [Format::THIMBLEWEED, Format::MONKEY] {
            let data = marshal(&dict, format);
            let decoded = unmarshal(&data, format).unwrap();
            assert_eq!(decoded, dict);
        }
    }

    #[test]
    fn test_round_trip_coordinates() {
        let dict = Dictionary::from([
            ("pos".to_owned(), Value::Coordinate("{12,34}".to_owned())),
            ("rect".to_owned(), Value::CoordinatePair("{{0,0},{1,1}}".to_owned())),
            ("poly".to_owned(), Value::CoordinateList("{{0,0},{1,1},{2,0}}".to_owned())),
        ]);
        let data = marshal(&dict, Format::MONKEY);
        assert_eq!(unmarshal(&data, Format::MONKEY).unwrap(), dict);
    }

    #[test]
    fn test_marshal_is_deterministic() {
        let dict = Dictionary::from([
            ("b".to_owned(), Value::from(1)),
            ("a".to_owned(), Value::from("x")),
            ("c".to_owned(), Value::Array(vec![Value::Null])),
        ]);
        assert_eq!(marshal(&dict, Format::THIMBLEWEED), marshal(&dict, Format::THIMBLEWEED));
        assert_eq!(marshal(&dict, Format::MONKEY), marshal(&dict, Format::MONKEY));
    }
}
