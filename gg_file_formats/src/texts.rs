//! Text tables and `@id` placeholder resolution.
//!
//! Game texts live in a tab-separated table mapping numeric IDs to
//! strings; scripts and dialogs reference them as `@12345`. The resolver
//! streams a byte source to a sink, substituting every `@<digits>`
//! occurrence it knows and passing everything else through untouched.

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

const ID_MARKER: u8 = b'@';

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// A data row has fewer than two tab-separated fields.
    BadRecord { line: usize },
    /// A data row's first field is not a numeric ID.
    BadId { line: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::BadRecord { line } => write!(f, "line {}: expected at least two fields", line),
            Error::BadId { line } => write!(f, "line {}: could not parse text ID", line),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// An ID → text table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    texts: HashMap<i64, String>,
}

impl Table {
    pub fn new() -> Table {
        Table { texts: HashMap::new() }
    }

    /// Reads a table from TSV data. The first row is a header and is
    /// skipped; every following row contributes its first two fields.
    /// Quotes are not interpreted.
    pub fn from_reader(r: impl Read) -> Result<Table, Error> {
        let mut table = Table::new();
        for (index, line) in BufReader::new(r).lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            if line_number == 1 || line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let id_field = fields.next().unwrap_or_default();
            let text = fields.next().ok_or(Error::BadRecord { line: line_number })?;
            let id = id_field.parse().map_err(|_| Error::BadId { line: line_number })?;
            table.texts.insert(id, text.to_owned());
        }
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Table, Error> {
        Table::from_reader(File::open(path)?)
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.texts.get(&id).map(String::as_str)
    }

    pub fn insert(&mut self, id: i64, text: impl Into<String>) {
        self.texts.insert(id, text.into());
    }

    /// Streams `r` to `w`, replacing every `@<digits>` with the mapped
    /// text. Unknown IDs are emitted unchanged, marker included; a lone
    /// `@` not followed by digits passes through verbatim.
    pub fn resolve(&self, r: impl Read, mut w: impl Write) -> io::Result<()> {
        let mut digits = String::new();
        let mut within_id = false;
        for byte in BufReader::new(r).bytes() {
            let byte = byte?;
            if byte == ID_MARKER {
                self.flush_id(&mut w, within_id, &digits)?;
                within_id = true;
                digits.clear();
                continue;
            }
            if within_id && byte.is_ascii_digit() {
                digits.push(byte as char);
                continue;
            }
            self.flush_id(&mut w, within_id, &digits)?;
            within_id = false;
            w.write_all(&[byte])?;
        }
        self.flush_id(&mut w, within_id, &digits)?;
        w.flush()
    }

    fn flush_id(&self, mut w: impl Write, within_id: bool, digits: &str) -> io::Result<()> {
        if !within_id {
            return Ok(());
        }
        if digits.is_empty() {
            return w.write_all(&[ID_MARKER]);
        }
        match digits.parse().ok().and_then(|id| self.get(id)) {
            Some(text) => w.write_all(text.as_bytes()),
            None => {
                w.write_all(&[ID_MARKER])?;
                w.write_all(digits.as_bytes())
            }
        }
    }

    /// Resolves placeholders in a string.
    pub fn resolve_to_string(&self, s: &str) -> io::Result<String> {
        let mut out = Vec::new();
        self.resolve(s.as_bytes(), &mut out)?;
        Ok(String::from_utf8(out).expect("resolved text is valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> Table {
        let mut table = Table::new();
        table.insert(10001, "hello");
        table.insert(10002, "world");
        table
    }

    #[test]
    fn test_from_reader() {
        let tsv = "id\ttext\n\
                   10001\thello\ten_us\n\
                   10002\tworld\n";
        let table = Table::from_reader(tsv.as_bytes()).unwrap();
        assert_eq!(table, test_table());
    }

    #[test]
    fn test_from_reader_header_only() {
        let table = Table::from_reader("id\ttext\n".as_bytes()).unwrap();
        assert_eq!(table, Table::new());
    }

    #[test]
    fn test_from_reader_bad_rows() {
        match Table::from_reader("id\ttext\nnope\n".as_bytes()) {
            Err(Error::BadRecord { line: 2 }) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        match Table::from_reader("id\ttext\nx\ty\n".as_bytes()) {
            Err(Error::BadId { line: 2 }) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resolve() {
        let table = test_table();
        let cases = [
            ("@10001, @10002", "hello, world"),
            ("say @10001", "say hello"),
            ("@10001@10002", "helloworld"),
            ("@99999 stays", "@99999 stays"),
            ("@abc @def@", "@abc @def@"),
            ("@", "@"),
            ("no markers at all", "no markers at all"),
            ("", ""),
            ("@10001", "hello"),
            ("trailing @10002", "trailing world"),
        ];
        for (input, want) in cases {
            assert_eq!(table.resolve_to_string(input).unwrap(), want, "input {:?}", input);
        }
    }

    #[test]
    fn test_resolve_streams_bytes() {
        let table = test_table();
        let mut out = Vec::new();
        table.resolve(&b"a @10001 b"[..], &mut out).unwrap();
        assert_eq!(out, b"a hello b");
    }

    #[test]
    fn test_resolve_preserves_utf8_text() {
        let mut table = Table::new();
        table.insert(7, "müßig");
        assert_eq!(table.resolve_to_string("@7 geht's").unwrap(), "müßig geht's");
    }
}
