use nom::{
    bytes::complete::tag,
    multi::many_till,
    number::complete::le_u32,
    sequence::tuple,
    IResult,
};

use super::{
    Dictionary, Error, Format, Value, FORMAT_SIGNATURE, TYPE_ARRAY, TYPE_COORDINATE,
    TYPE_COORDINATE_LIST, TYPE_COORDINATE_PAIR, TYPE_DICTIONARY, TYPE_FLOAT, TYPE_INTEGER,
    TYPE_NULL, TYPE_OFFSETS, TYPE_STRING,
};

/// Decodes GGDict bytes into a dictionary tree.
pub fn unmarshal(data: &[u8], format: Format) -> Result<Dictionary, Error> {
    let (_, (signature, _version, offsets_start)) =
        header(data).map_err(|_| Error::Truncated)?;
    if signature != FORMAT_SIGNATURE {
        return Err(Error::Signature(signature));
    }
    let offsets_section = data.get(offsets_start as usize..).ok_or(Error::BadOffsetIndex)?;
    let (_, (offsets, _)) = string_offsets(offsets_section).map_err(|_| Error::BadOffsetIndex)?;

    let mut u = Unmarshaller { buf: data, offset: 12, offsets, format };
    match u.read_byte()? {
        TYPE_DICTIONARY => u.read_dictionary(),
        _ => Err(Error::RootNotDictionary),
    }
}

fn header(input: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    tuple((le_u32, le_u32, le_u32))(input)
}

fn string_offsets(input: &[u8]) -> IResult<&[u8], (Vec<u32>, &[u8])> {
    let (input, _) = tag([TYPE_OFFSETS])(input)?;
    many_till(le_u32, tag([0xFF, 0xFF, 0xFF, 0xFF]))(input)
}

struct Unmarshaller<'a> {
    buf: &'a [u8],
    offset: usize,
    offsets: Vec<u32>,
    format: Format,
}

impl Unmarshaller<'_> {
    fn read_value(&mut self) -> Result<Value, Error> {
        match self.read_byte()? {
            TYPE_NULL => Ok(Value::Null),
            TYPE_DICTIONARY => Ok(Value::Dictionary(self.read_dictionary()?)),
            TYPE_ARRAY => Ok(Value::Array(self.read_array()?)),
            TYPE_STRING => Ok(Value::String(self.read_string()?)),
            TYPE_INTEGER => {
                let text = self.read_string()?;
                text.parse().map(Value::Integer).map_err(|_| Error::InvalidInteger(text))
            }
            TYPE_FLOAT => {
                let text = self.read_string()?;
                text.parse().map(Value::Float).map_err(|_| Error::InvalidFloat(text))
            }
            TYPE_COORDINATE if self.format.coordinate_types => {
                Ok(Value::Coordinate(self.read_string()?))
            }
            TYPE_COORDINATE_PAIR if self.format.coordinate_types => {
                Ok(Value::CoordinatePair(self.read_string()?))
            }
            TYPE_COORDINATE_LIST if self.format.coordinate_types => {
                Ok(Value::CoordinateList(self.read_string()?))
            }
            marker => Err(Error::UnknownType(marker)),
        }
    }

    fn read_dictionary(&mut self) -> Result<Dictionary, Error> {
        let length = self.read_u32()?;
        let mut dictionary = Dictionary::new();
        for _ in 0..length {
            let key = self.read_string()?;
            let value = self.read_value().map_err(|e| Error::Context {
                what: format!("dictionary key {:?}", key),
                source: Box::new(e),
            })?;
            dictionary.insert(key, value);
        }
        if self.read_byte()? != TYPE_DICTIONARY {
            return Err(Error::UnterminatedDictionary);
        }
        Ok(dictionary)
    }

    fn read_array(&mut self) -> Result<Vec<Value>, Error> {
        let length = self.read_u32()?;
        let mut array = Vec::new();
        for i in 0..length {
            let value = self.read_value().map_err(|e| Error::Context {
                what: format!("array element {}", i),
                source: Box::new(e),
            })?;
            array.push(value);
        }
        if self.read_byte()? != TYPE_ARRAY {
            return Err(Error::UnterminatedArray);
        }
        Ok(array)
    }

    fn read_string(&mut self) -> Result<String, Error> {
        let index = self.read_index()?;
        let start = *self
            .offsets
            .get(index)
            .ok_or(Error::StringIndexOutOfRange { index, len: self.offsets.len() })?
            as usize;
        let tail = self.buf.get(start..).ok_or(Error::Truncated)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).map(str::to_owned).map_err(|_| Error::InvalidUtf8)
    }

    fn read_index(&mut self) -> Result<usize, Error> {
        if self.format.short_string_indices {
            let bytes = self.read_bytes(2)?;
            Ok(u16::from_le_bytes(bytes.try_into().unwrap()) as usize)
        } else {
            Ok(self.read_u32()? as usize)
        }
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_bytes(&mut self, n: usize) -> Result<&[u8], Error> {
        let bytes = self.buf.get(self.offset..self.offset + n).ok_or(Error::Truncated)?;
        self.offset += n;
        Ok(bytes)
    }
}
