use std::collections::HashMap;

use super::{
    Dictionary, Format, Value, FORMAT_SIGNATURE, OFFSETS_TERMINATOR, TYPE_ARRAY, TYPE_COORDINATE,
    TYPE_COORDINATE_LIST, TYPE_COORDINATE_PAIR, TYPE_DICTIONARY, TYPE_FLOAT, TYPE_INTEGER,
    TYPE_NULL, TYPE_OFFSETS, TYPE_STRING, TYPE_STRINGS,
};

/// Serializes a dictionary tree to GGDict bytes.
///
/// The output is deterministic: dictionary keys are written in
/// lexicographic order and every distinct string is interned exactly once,
/// in first-use order.
pub fn marshal(dict: &Dictionary, format: Format) -> Vec<u8> {
    let mut m = Marshaller {
        buf: Vec::new(),
        strings: Vec::new(),
        string_indices: HashMap::new(),
        format,
    };
    m.write_raw_u32(FORMAT_SIGNATURE);
    m.write_raw_u32(1); // unused, as far as known
    m.write_raw_u32(0); // patched to the string offsets position below
    m.write_dictionary(dict);
    m.write_string_offsets();
    m.write_strings();
    m.buf
}

struct Marshaller {
    buf: Vec<u8>,
    strings: Vec<String>,
    string_indices: HashMap<String, usize>,
    format: Format,
}

impl Marshaller {
    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.buf.push(TYPE_NULL),
            Value::Dictionary(d) => self.write_dictionary(d),
            Value::Array(a) => self.write_array(a),
            Value::String(s) => {
                self.buf.push(TYPE_STRING);
                self.write_string_index(s);
            }
            Value::Integer(i) => {
                self.buf.push(TYPE_INTEGER);
                self.write_string_index(&i.to_string());
            }
            Value::Float(f) => {
                self.buf.push(TYPE_FLOAT);
                self.write_string_index(&format_float(*f));
            }
            Value::Coordinate(s) => {
                self.buf.push(TYPE_COORDINATE);
                self.write_string_index(s);
            }
            Value::CoordinatePair(s) => {
                self.buf.push(TYPE_COORDINATE_PAIR);
                self.write_string_index(s);
            }
            Value::CoordinateList(s) => {
                self.buf.push(TYPE_COORDINATE_LIST);
                self.write_string_index(s);
            }
        }
    }

    fn write_dictionary(&mut self, dict: &Dictionary) {
        self.buf.push(TYPE_DICTIONARY);
        self.write_raw_u32(dict.len() as u32);
        for (key, value) in dict {
            self.write_string_index(key);
            self.write_value(value);
        }
        self.buf.push(TYPE_DICTIONARY);
    }

    fn write_array(&mut self, array: &[Value]) {
        self.buf.push(TYPE_ARRAY);
        self.write_raw_u32(array.len() as u32);
        for value in array {
            self.write_value(value);
        }
        self.buf.push(TYPE_ARRAY);
    }

    fn write_string_index(&mut self, s: &str) {
        let index = match self.string_indices.get(s) {
            Some(&index) => index,
            None => {
                let index = self.strings.len();
                self.string_indices.insert(s.to_owned(), index);
                self.strings.push(s.to_owned());
                index
            }
        };
        if self.format.short_string_indices {
            self.buf.extend_from_slice(&(index as u16).to_le_bytes());
        } else {
            self.write_raw_u32(index as u32);
        }
    }

    fn write_string_offsets(&mut self) {
        let offsets_start = self.buf.len() as u32;
        self.buf[8..12].copy_from_slice(&offsets_start.to_le_bytes());
        self.buf.push(TYPE_OFFSETS);
        // First string byte: past the offsets (4 bytes each), the
        // terminator and the string pool marker.
        let mut str_offset = self.buf.len() + 4 * self.strings.len() + 5;
        for i in 0..self.strings.len() {
            self.write_raw_u32(str_offset as u32);
            str_offset += self.strings[i].len() + 1;
        }
        self.write_raw_u32(OFFSETS_TERMINATOR);
    }

    fn write_strings(&mut self) {
        self.buf.push(TYPE_STRINGS);
        for s in &self.strings {
            self.buf.extend_from_slice(s.as_bytes());
            self.buf.push(0);
        }
    }

    fn write_raw_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Shortest decimal representation that parses back to the same double.
fn format_float(f: f64) -> String {
    f.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_empty_dictionary() {
        let want: &[u8] = &[
            // format signature
            0x1, 0x2, 0x3, 0x4,
            // always 1
            0x1, 0x0, 0x0, 0x0,
            // string offsets start offset (18)
            0x12, 0x0, 0x0, 0x0,
            // dictionary start marker, length 0, end marker
            0x2, 0x0, 0x0, 0x0, 0x0, 0x2,
            // string offsets marker, no offsets, terminator
            0x7, 0xFF, 0xFF, 0xFF, 0xFF,
            // string pool marker, no strings
            0x8,
        ];
        assert_eq!(marshal(&Dictionary::new(), Format::THIMBLEWEED), want);
    }

    #[test]
    fn test_marshal_known_bytes() {
        let dict = Dictionary::from([
            (
                "key_array".to_owned(),
                Value::Array(vec![Value::from("test"), Value::from(14), Value::from(3.2)]),
            ),
            (
                "key_dictionary".to_owned(),
                Value::Dictionary(Dictionary::from([
                    ("key_a".to_owned(), Value::from(26)),
                    ("key_b".to_owned(), Value::from(54.8)),
                    ("key_c".to_owned(), Value::from("test")),
                ])),
            ),
            ("key_float32".to_owned(), Value::from(0.5)),
            ("key_float64".to_owned(), Value::from(0.5)),
            ("key_int".to_owned(), Value::from(4)),
            ("key_int32".to_owned(), Value::from(5)),
            ("key_int64".to_owned(), Value::from(6)),
            ("key_null".to_owned(), Value::Null),
            ("key_string".to_owned(), Value::from("test")),
            ("key_uint32".to_owned(), Value::from(7)),
            ("key_uint64".to_owned(), Value::from(8)),
        ]);
        let want: &[u8] = &[
            // format signature
            0x1, 0x2, 0x3, 0x4,
            // always 1
            0x1, 0x0, 0x0, 0x0,
            // string offsets start offset (157)
            0x9D, 0x0, 0x0, 0x0,
            // dictionary start marker, length 11
            0x2, 0xB, 0x0, 0x0, 0x0,
            // "key_array": array of ["test", 14, 3.2]
            0x0, 0x0, 0x0, 0x0,
            0x3, 0x3, 0x0, 0x0, 0x0,
            0x4, 0x1, 0x0, 0x0, 0x0,
            0x5, 0x2, 0x0, 0x0, 0x0,
            0x6, 0x3, 0x0, 0x0, 0x0,
            0x3,
            // "key_dictionary": {key_a: 26, key_b: 54.8, key_c: "test"}
            0x4, 0x0, 0x0, 0x0,
            0x2, 0x3, 0x0, 0x0, 0x0,
            0x5, 0x0, 0x0, 0x0, 0x5, 0x6, 0x0, 0x0, 0x0,
            0x7, 0x0, 0x0, 0x0, 0x6, 0x8, 0x0, 0x0, 0x0,
            0x9, 0x0, 0x0, 0x0, 0x4, 0x1, 0x0, 0x0, 0x0,
            0x2,
            // "key_float32": 0.5
            0xA, 0x0, 0x0, 0x0, 0x6, 0xB, 0x0, 0x0, 0x0,
            // "key_float64": 0.5
            0xC, 0x0, 0x0, 0x0, 0x6, 0xB, 0x0, 0x0, 0x0,
            // "key_int": 4
            0xD, 0x0, 0x0, 0x0, 0x5, 0xE, 0x0, 0x0, 0x0,
            // "key_int32": 5
            0xF, 0x0, 0x0, 0x0, 0x5, 0x10, 0x0, 0x0, 0x0,
            // "key_int64": 6
            0x11, 0x0, 0x0, 0x0, 0x5, 0x12, 0x0, 0x0, 0x0,
            // "key_null": null
            0x13, 0x0, 0x0, 0x0, 0x1,
            // "key_string": "test"
            0x14, 0x0, 0x0, 0x0, 0x4, 0x1, 0x0, 0x0, 0x0,
            // "key_uint32": 7
            0x15, 0x0, 0x0, 0x0, 0x5, 0x16, 0x0, 0x0, 0x0,
            // "key_uint64": 8
            0x17, 0x0, 0x0, 0x0, 0x5, 0x18, 0x0, 0x0, 0x0,
            // dictionary end marker
            0x2,
            // string offsets
            0x7,
            0x07, 0x1, 0x0, 0x0,
            0x11, 0x1, 0x0, 0x0,
            0x16, 0x1, 0x0, 0x0,
            0x19, 0x1, 0x0, 0x0,
            0x1D, 0x1, 0x0, 0x0,
            0x2C, 0x1, 0x0, 0x0,
            0x32, 0x1, 0x0, 0x0,
            0x35, 0x1, 0x0, 0x0,
            0x3B, 0x1, 0x0, 0x0,
            0x40, 0x1, 0x0, 0x0,
            0x46, 0x1, 0x0, 0x0,
            0x52, 0x1, 0x0, 0x0,
            0x56, 0x1, 0x0, 0x0,
            0x62, 0x1, 0x0, 0x0,
            0x6A, 0x1, 0x0, 0x0,
            0x6C, 0x1, 0x0, 0x0,
            0x76, 0x1, 0x0, 0x0,
            0x78, 0x1, 0x0, 0x0,
            0x82, 0x1, 0x0, 0x0,
            0x84, 0x1, 0x0, 0x0,
            0x8D, 0x1, 0x0, 0x0,
            0x98, 0x1, 0x0, 0x0,
            0xA3, 0x1, 0x0, 0x0,
            0xA5, 0x1, 0x0, 0x0,
            0xB0, 0x1, 0x0, 0x0,
            0xFF, 0xFF, 0xFF, 0xFF,
            // string pool
            0x8,
            0x6B, 0x65, 0x79, 0x5F, 0x61, 0x72, 0x72, 0x61, 0x79, 0x0, // "key_array"
            0x74, 0x65, 0x73, 0x74, 0x0, // "test"
            0x31, 0x34, 0x0, // "14"
            0x33, 0x2E, 0x32, 0x0, // "3.2"
            0x6B, 0x65, 0x79, 0x5F, 0x64, 0x69, 0x63, 0x74, 0x69, 0x6F, 0x6E, 0x61, 0x72,
            0x79, 0x0, // "key_dictionary"
            0x6B, 0x65, 0x79, 0x5F, 0x61, 0x0, // "key_a"
            0x32, 0x36, 0x0, // "26"
            0x6B, 0x65, 0x79, 0x5F, 0x62, 0x0, // "key_b"
            0x35, 0x34, 0x2E, 0x38, 0x0, // "54.8"
            0x6B, 0x65, 0x79, 0x5F, 0x63, 0x0, // "key_c"
            0x6B, 0x65, 0x79, 0x5F, 0x66, 0x6C, 0x6F, 0x61, 0x74, 0x33, 0x32, 0x0, // "key_float32"
            0x30, 0x2E, 0x35, 0x0, // "0.5"
            0x6B, 0x65, 0x79, 0x5F, 0x66, 0x6C, 0x6F, 0x61, 0x74, 0x36, 0x34, 0x0, // "key_float64"
            0x6B, 0x65, 0x79, 0x5F, 0x69, 0x6E, 0x74, 0x0, // "key_int"
            0x34, 0x0, // "4"
            0x6B, 0x65, 0x79, 0x5F, 0x69, 0x6E, 0x74, 0x33, 0x32, 0x0, // "key_int32"
            0x35, 0x0, // "5"
            0x6B, 0x65, 0x79, 0x5F, 0x69, 0x6E, 0x74, 0x36, 0x34, 0x0, // "key_int64"
            0x36, 0x0, // "6"
            0x6B, 0x65, 0x79, 0x5F, 0x6E, 0x75, 0x6C, 0x6C, 0x0, // "key_null"
            0x6B, 0x65, 0x79, 0x5F, 0x73, 0x74, 0x72, 0x69, 0x6E, 0x67, 0x0, // "key_string"
            0x6B, 0x65, 0x79, 0x5F, 0x75, 0x69, 0x6E, 0x74, 0x33, 0x32, 0x0, // "key_uint32"
            0x37, 0x0, // "7"
            0x6B, 0x65, 0x79, 0x5F, 0x75, 0x69, 0x6E, 0x74, 0x36, 0x34, 0x0, // "key_uint64"
            0x38, 0x0, // "8"
        ];
        assert_eq!(marshal(&dict, Format::THIMBLEWEED), want);
    }

    #[test]
    fn test_marshal_short_indices() {
        let dict = Dictionary::from([("a".to_owned(), Value::from("b"))]);
        let want: &[u8] = &[
            0x1, 0x2, 0x3, 0x4, // format signature
            0x1, 0x0, 0x0, 0x0, // always 1
            0x17, 0x0, 0x0, 0x0, // string offsets start offset (23)
            0x2, 0x1, 0x0, 0x0, 0x0, // dictionary start, length 1
            0x0, 0x0, // key index 0: "a" (16-bit)
            0x4, 0x1, 0x0, // string, index 1: "b"
            0x2, // dictionary end marker
            0x7, // string offsets
            0x25, 0x0, 0x0, 0x0, // "a" at 37
            0x27, 0x0, 0x0, 0x0, // "b" at 39
            0xFF, 0xFF, 0xFF, 0xFF,
            0x8, // string pool
            0x61, 0x0, 0x62, 0x0,
        ];
        assert_eq!(marshal(&dict, Format::MONKEY), want);
    }

    #[test]
    fn test_float_formatting_is_shortest_round_trip() {
        for f in [0.5, 3.2, 54.8, 2.6, 1.4, 0.1 + 0.2, 1.0, -7.25] {
            let text = format_float(f);
            assert_eq!(text.parse::<f64>().unwrap(), f, "{}", text);
        }
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(3.2), "3.2");
    }
}
