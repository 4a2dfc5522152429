//! Network NBT.
//!
//! Modern protocol versions send NBT payloads *anonymously*: the root tag has
//! no name, the payload starts directly at the type byte, and a lone
//! `TAG_End` byte stands for "no data". The [`valence_nbt`] crate supplies
//! the data model; the unnamed-root wire layout is implemented here.

use std::io::Write;

use anyhow::{bail, ensure, Context};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use valence_nbt::{Compound, List, Value};

use crate::protocol::{Decode, Encode};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Nesting depth limit for untrusted payloads.
const MAX_DEPTH: u32 = 512;

/// An anonymous NBT payload. `None` is encoded as a single `TAG_End` byte.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Nbt(pub Option<Value>);

impl Nbt {
    pub fn compound(compound: Compound) -> Self {
        Self(Some(Value::Compound(compound)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// A reference to the payload if it is a compound.
    pub fn as_compound(&self) -> Option<&Compound> {
        match &self.0 {
            Some(Value::Compound(c)) => Some(c),
            _ => None,
        }
    }
}

impl From<Compound> for Nbt {
    fn from(compound: Compound) -> Self {
        Self::compound(compound)
    }
}

impl Encode for Nbt {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match &self.0 {
            None => Ok(w.write_u8(TAG_END)?),
            Some(value) => {
                w.write_u8(tag_of(value))?;
                write_value(&mut w, value)
            }
        }
    }
}

impl Decode<'_> for Nbt {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let tag = r.read_u8()?;
        if tag == TAG_END {
            return Ok(Self(None));
        }
        Ok(Self(Some(read_value(r, tag, 0)?)))
    }
}

/// Anonymous NBT whose root must be a compound (or `TAG_End` for an empty
/// one). Used where the protocol promises compound-shaped data, e.g. registry
/// entries and block-entity payloads.
impl Encode for Compound {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        w.write_u8(TAG_COMPOUND)?;
        write_compound(&mut w, self)
    }
}

impl Decode<'_> for Compound {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        match r.read_u8()? {
            TAG_END => Ok(Compound::new()),
            TAG_COMPOUND => read_compound(r, 0),
            tag => bail!("expected compound NBT, got tag {tag}"),
        }
    }
}

fn tag_of(value: &Value) -> u8 {
    match value {
        Value::Byte(_) => TAG_BYTE,
        Value::Short(_) => TAG_SHORT,
        Value::Int(_) => TAG_INT,
        Value::Long(_) => TAG_LONG,
        Value::Float(_) => TAG_FLOAT,
        Value::Double(_) => TAG_DOUBLE,
        Value::ByteArray(_) => TAG_BYTE_ARRAY,
        Value::String(_) => TAG_STRING,
        Value::List(_) => TAG_LIST,
        Value::Compound(_) => TAG_COMPOUND,
        Value::IntArray(_) => TAG_INT_ARRAY,
        Value::LongArray(_) => TAG_LONG_ARRAY,
    }
}

fn write_string(w: &mut impl Write, s: &str) -> anyhow::Result<()> {
    ensure!(
        s.len() <= u16::MAX as usize,
        "NBT string of {} bytes is too long",
        s.len()
    );
    w.write_u16::<BigEndian>(s.len() as u16)?;
    Ok(w.write_all(s.as_bytes())?)
}

fn read_string(r: &mut &[u8]) -> anyhow::Result<String> {
    let len = r.read_u16::<BigEndian>()? as usize;
    ensure!(r.len() >= len, "not enough data for NBT string of {len} bytes");
    let (bytes, rest) = r.split_at(len);
    *r = rest;
    Ok(std::str::from_utf8(bytes)
        .context("NBT string is not valid UTF-8")?
        .to_owned())
}

fn write_value(w: &mut impl Write, value: &Value) -> anyhow::Result<()> {
    match value {
        Value::Byte(v) => w.write_i8(*v)?,
        Value::Short(v) => w.write_i16::<BigEndian>(*v)?,
        Value::Int(v) => w.write_i32::<BigEndian>(*v)?,
        Value::Long(v) => w.write_i64::<BigEndian>(*v)?,
        Value::Float(v) => w.write_f32::<BigEndian>(*v)?,
        Value::Double(v) => w.write_f64::<BigEndian>(*v)?,
        Value::ByteArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for b in v {
                w.write_i8(*b)?;
            }
        }
        Value::String(v) => write_string(w, v)?,
        Value::List(v) => write_list(w, v)?,
        Value::Compound(v) => write_compound(w, v)?,
        Value::IntArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for i in v {
                w.write_i32::<BigEndian>(*i)?;
            }
        }
        Value::LongArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for l in v {
                w.write_i64::<BigEndian>(*l)?;
            }
        }
    }

    Ok(())
}

fn write_list(w: &mut impl Write, list: &List) -> anyhow::Result<()> {
    fn header(w: &mut impl Write, tag: u8, len: usize) -> anyhow::Result<()> {
        w.write_u8(tag)?;
        Ok(w.write_i32::<BigEndian>(len as i32)?)
    }

    match list {
        List::End => header(w, TAG_END, 0),
        List::Byte(v) => {
            header(w, TAG_BYTE, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_i8(*e)?))
        }
        List::Short(v) => {
            header(w, TAG_SHORT, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_i16::<BigEndian>(*e)?))
        }
        List::Int(v) => {
            header(w, TAG_INT, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_i32::<BigEndian>(*e)?))
        }
        List::Long(v) => {
            header(w, TAG_LONG, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_i64::<BigEndian>(*e)?))
        }
        List::Float(v) => {
            header(w, TAG_FLOAT, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_f32::<BigEndian>(*e)?))
        }
        List::Double(v) => {
            header(w, TAG_DOUBLE, v.len())?;
            v.iter().try_for_each(|e| Ok(w.write_f64::<BigEndian>(*e)?))
        }
        List::ByteArray(v) => {
            header(w, TAG_BYTE_ARRAY, v.len())?;
            v.iter()
                .try_for_each(|e| write_value(w, &Value::ByteArray(e.clone())))
        }
        List::String(v) => {
            header(w, TAG_STRING, v.len())?;
            v.iter().try_for_each(|e| write_string(w, e))
        }
        List::List(v) => {
            header(w, TAG_LIST, v.len())?;
            v.iter().try_for_each(|e| write_list(w, e))
        }
        List::Compound(v) => {
            header(w, TAG_COMPOUND, v.len())?;
            v.iter().try_for_each(|e| write_compound(w, e))
        }
        List::IntArray(v) => {
            header(w, TAG_INT_ARRAY, v.len())?;
            v.iter()
                .try_for_each(|e| write_value(w, &Value::IntArray(e.clone())))
        }
        List::LongArray(v) => {
            header(w, TAG_LONG_ARRAY, v.len())?;
            v.iter()
                .try_for_each(|e| write_value(w, &Value::LongArray(e.clone())))
        }
    }
}

fn write_compound(w: &mut impl Write, compound: &Compound) -> anyhow::Result<()> {
    for (name, value) in compound.iter() {
        w.write_u8(tag_of(value))?;
        write_string(w, name)?;
        write_value(w, value)?;
    }
    Ok(w.write_u8(TAG_END)?)
}

fn read_value(r: &mut &[u8], tag: u8, depth: u32) -> anyhow::Result<Value> {
    ensure!(depth < MAX_DEPTH, "NBT is nested too deeply");

    fn read_len(r: &mut &[u8]) -> anyhow::Result<usize> {
        let len = r.read_i32::<BigEndian>()?;
        ensure!(len >= 0, "negative NBT array length of {len}");
        Ok(len as usize)
    }

    Ok(match tag {
        TAG_BYTE => Value::Byte(r.read_i8()?),
        TAG_SHORT => Value::Short(r.read_i16::<BigEndian>()?),
        TAG_INT => Value::Int(r.read_i32::<BigEndian>()?),
        TAG_LONG => Value::Long(r.read_i64::<BigEndian>()?),
        TAG_FLOAT => Value::Float(r.read_f32::<BigEndian>()?),
        TAG_DOUBLE => Value::Double(r.read_f64::<BigEndian>()?),
        TAG_BYTE_ARRAY => {
            let len = read_len(r)?;
            ensure!(r.len() >= len, "not enough data for NBT byte array");
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i8()?);
            }
            Value::ByteArray(v)
        }
        TAG_STRING => Value::String(read_string(r)?),
        TAG_LIST => Value::List(read_list(r, depth)?),
        TAG_COMPOUND => Value::Compound(read_compound(r, depth)?),
        TAG_INT_ARRAY => {
            let len = read_len(r)?;
            ensure!(r.len() >= len * 4, "not enough data for NBT int array");
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i32::<BigEndian>()?);
            }
            Value::IntArray(v)
        }
        TAG_LONG_ARRAY => {
            let len = read_len(r)?;
            ensure!(r.len() >= len * 8, "not enough data for NBT long array");
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i64::<BigEndian>()?);
            }
            Value::LongArray(v)
        }
        tag => bail!("invalid NBT tag of {tag}"),
    })
}

fn read_list(r: &mut &[u8], depth: u32) -> anyhow::Result<List> {
    let elem_tag = r.read_u8()?;
    let len = r.read_i32::<BigEndian>()?;
    ensure!(len >= 0, "negative NBT list length of {len}");
    let len = len as usize;

    if elem_tag == TAG_END {
        ensure!(len == 0, "list of TAG_End with nonzero length");
        return Ok(List::End);
    }

    macro_rules! read_into {
        ($variant:ident, $pat:pat => $elem:expr) => {{
            let mut v = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                match read_value(r, elem_tag, depth + 1)? {
                    $pat => v.push($elem),
                    _ => unreachable!(),
                }
            }
            List::$variant(v)
        }};
    }

    Ok(match elem_tag {
        TAG_BYTE => read_into!(Byte, Value::Byte(e) => e),
        TAG_SHORT => read_into!(Short, Value::Short(e) => e),
        TAG_INT => read_into!(Int, Value::Int(e) => e),
        TAG_LONG => read_into!(Long, Value::Long(e) => e),
        TAG_FLOAT => read_into!(Float, Value::Float(e) => e),
        TAG_DOUBLE => read_into!(Double, Value::Double(e) => e),
        TAG_BYTE_ARRAY => read_into!(ByteArray, Value::ByteArray(e) => e),
        TAG_STRING => read_into!(String, Value::String(e) => e),
        TAG_LIST => read_into!(List, Value::List(e) => e),
        TAG_COMPOUND => read_into!(Compound, Value::Compound(e) => e),
        TAG_INT_ARRAY => read_into!(IntArray, Value::IntArray(e) => e),
        TAG_LONG_ARRAY => read_into!(LongArray, Value::LongArray(e) => e),
        tag => bail!("invalid NBT list element tag of {tag}"),
    })
}

fn read_compound(r: &mut &[u8], depth: u32) -> anyhow::Result<Compound> {
    ensure!(depth < MAX_DEPTH, "NBT is nested too deeply");

    let mut compound = Compound::new();
    loop {
        let tag = r.read_u8()?;
        if tag == TAG_END {
            return Ok(compound);
        }

        let name = read_string(r)?;
        let value = read_value(r, tag, depth + 1)?;
        compound.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use valence_nbt::compound;

    use super::*;

    fn example() -> Compound {
        compound! {
            "byte" => 5_i8,
            "string" => "hello",
            "longs" => vec![1_i64, 2, 3],
            "nested" => compound! {
                "pi" => 3.14_f64,
                "list" => List::Int(vec![7, 8, 9]),
            },
        }
    }

    #[test]
    fn compound_round_trip() {
        let nbt = Nbt::compound(example());

        let mut buf = vec![];
        nbt.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(Nbt::decode(&mut slice).unwrap(), nbt);
        assert!(slice.is_empty());

        // Re-encoding reproduces the bytes exactly.
        let mut buf2 = vec![];
        nbt.encode(&mut buf2).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn empty_is_a_single_end_byte() {
        let mut buf = vec![];
        Nbt::default().encode(&mut buf).unwrap();
        assert_eq!(buf, [0]);

        let mut slice = buf.as_slice();
        assert!(Nbt::decode(&mut slice).unwrap().is_empty());
    }

    #[test]
    fn anonymous_string_root() {
        // Text components may arrive as a bare TAG_String root.
        let nbt = Nbt(Some(Value::String("hi".into())));

        let mut buf = vec![];
        nbt.encode(&mut buf).unwrap();
        assert_eq!(buf, [TAG_STRING, 0, 2, b'h', b'i']);

        let mut slice = buf.as_slice();
        assert_eq!(Nbt::decode(&mut slice).unwrap(), nbt);
    }

    #[test]
    fn typed_compound_rejects_scalar_root() {
        let mut buf = vec![];
        Nbt(Some(Value::Int(1))).encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert!(Compound::decode(&mut slice).is_err());
    }
}
