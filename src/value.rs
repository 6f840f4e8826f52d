//! The value codec: reading and writing typed [`Value`]s against a byte
//! buffer, honouring the D-Bus alignment and endianness rules.

use crate::buf::{Reader, Writer};
use crate::error::{Error, ErrorKind, Result};
use crate::object_path::ObjectPath;
use crate::signature::Signature;
use crate::ty::Type;

/// The maximum byte length of an array's element region (2^26, per the
/// D-Bus specification).
pub const MAX_ARRAY_LEN: u32 = 1 << 26;

/// A D-Bus value: a tagged union mirroring [`Type`], with boxed composites
/// so the representation stays a plain enum rather than reaching for
/// dynamic dispatch.
///
/// `Array` and `Dict` carry their element type(s) explicitly alongside the
/// elements, since an empty collection otherwise has no way to recover what
/// it was declared to hold - this is what lets an empty array or dict
/// round-trip through encode/decode with its signature intact.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `y`
    Byte(u8),
    /// `b`
    Boolean(bool),
    /// `n`
    Int16(i16),
    /// `q`
    UInt16(u16),
    /// `i`
    Int32(i32),
    /// `u`
    UInt32(u32),
    /// `x`
    Int64(i64),
    /// `t`
    UInt64(u64),
    /// `d`
    Double(f64),
    /// `s`
    String(String),
    /// `o`
    ObjectPath(ObjectPath),
    /// `g`
    Signature(Signature),
    /// `h` - an opaque index into an out-of-band fd table; this crate never
    /// resolves it to an actual file descriptor.
    UnixFd(u32),
    /// `v`
    Variant(Box<Value>),
    /// `a` + element type.
    Array(Type, Vec<Value>),
    /// `(...)`
    Struct(Vec<Value>),
    /// `a{..}`, exposed as an ordered mapping rather than an array of pairs.
    Dict(Type, Type, Vec<(Value, Value)>),
}

impl Value {
    /// The [`Type`] this value would be marshalled as.
    pub fn ty(&self) -> Type {
        match self {
            Value::Byte(_) => Type::Byte,
            Value::Boolean(_) => Type::Boolean,
            Value::Int16(_) => Type::Int16,
            Value::UInt16(_) => Type::UInt16,
            Value::Int32(_) => Type::Int32,
            Value::UInt32(_) => Type::UInt32,
            Value::Int64(_) => Type::Int64,
            Value::UInt64(_) => Type::UInt64,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::ObjectPath(_) => Type::ObjectPath,
            Value::Signature(_) => Type::Signature,
            Value::UnixFd(_) => Type::UnixFd,
            Value::Variant(_) => Type::Variant,
            Value::Array(elem, _) => Type::array(elem.clone()),
            Value::Struct(fields) => Type::Struct(fields.iter().map(Value::ty).collect()),
            Value::Dict(key, value, _) => Type::array(Type::dict_entry(key.clone(), value.clone())),
        }
    }

    /// Shorthand for constructing a `Value::String`.
    pub fn str(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }
}

/// Read a value of the given `ty` from `reader`, aligning first.
pub(crate) fn read_value(reader: &mut Reader<'_>, ty: &Type) -> Result<Value> {
    reader.align(ty.alignment())?;

    let value = match ty {
        Type::Byte => Value::Byte(reader.read_u8()?),
        Type::Boolean => {
            let raw = reader.read_u32()?;

            match raw {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                _ => return Err(Error::new(ErrorKind::InvalidValue("boolean was not 0 or 1"))),
            }
        }
        Type::Int16 => Value::Int16(reader.read_i16()?),
        Type::UInt16 => Value::UInt16(reader.read_u16()?),
        Type::Int32 => Value::Int32(reader.read_i32()?),
        Type::UInt32 => Value::UInt32(reader.read_u32()?),
        Type::Int64 => Value::Int64(reader.read_i64()?),
        Type::UInt64 => Value::UInt64(reader.read_u64()?),
        Type::Double => Value::Double(reader.read_f64()?),
        Type::String => Value::String(read_string(reader)?),
        Type::ObjectPath => {
            let s = read_string(reader)?;
            Value::ObjectPath(ObjectPath::new(s)?)
        }
        Type::Signature => Value::Signature(read_signature(reader)?),
        Type::UnixFd => Value::UnixFd(reader.read_u32()?),
        Type::Variant => {
            let sig = read_signature(reader)?;
            let ty = Signature::single_type(sig.as_str())?;
            Value::Variant(Box::new(read_value(reader, &ty)?))
        }
        Type::Array(elem) => match elem.as_ref() {
            Type::DictEntry(key, value) => read_dict(reader, key, value)?,
            _ => {
                let (elem_ty, items) = read_array_region(reader, elem)?;
                Value::Array(elem_ty, items)
            }
        },
        Type::Struct(fields) => {
            reader.align(8)?;
            let mut values = Vec::with_capacity(fields.len());

            for field in fields {
                values.push(read_value(reader, field)?);
            }

            Value::Struct(values)
        }
        Type::DictEntry(key, value) => {
            // Only reachable when a caller reads a dict entry directly
            // (outside of its enclosing array); marshal it like a struct.
            reader.align(8)?;
            let k = read_value(reader, key)?;
            let v = read_value(reader, value)?;
            Value::Struct(vec![k, v])
        }
    };

    Ok(value)
}

/// Read the element region of an `ARRAY(elem)` or `ARRAY(DICT_ENTRY(K, V))`.
fn read_array_region(reader: &mut Reader<'_>, elem: &Type) -> Result<(Type, Vec<Value>)> {
    let len = reader.read_u32()?;

    if len > MAX_ARRAY_LEN {
        return Err(Error::new(ErrorKind::ArrayTooLong(len)));
    }

    reader.align(elem.alignment())?;
    let start = reader.absolute_position();
    let len = len as usize;

    let mut items = Vec::new();

    while reader.absolute_position() - start < len {
        items.push(read_value(reader, elem)?);
    }

    if reader.absolute_position() - start != len {
        return Err(Error::new(ErrorKind::InvalidHeader(
            "array element region did not align to declared length",
        )));
    }

    Ok((elem.clone(), items))
}

/// Read a `DICT_ENTRY(K, V)` array into an ordered `Value::Dict`, merging
/// every entry of the array into one mapping.
pub(crate) fn read_dict(reader: &mut Reader<'_>, key: &Type, value: &Type) -> Result<Value> {
    let len = reader.read_u32()?;

    if len > MAX_ARRAY_LEN {
        return Err(Error::new(ErrorKind::ArrayTooLong(len)));
    }

    // A dict entry's alignment (8) dominates the array's own (4).
    reader.align(8)?;
    let start = reader.absolute_position();
    let len = len as usize;

    let mut pairs = Vec::new();

    while reader.absolute_position() - start < len {
        reader.align(8)?;
        let k = read_value(reader, key)?;
        let v = read_value(reader, value)?;
        pairs.push((k, v));
    }

    if reader.absolute_position() - start != len {
        return Err(Error::new(ErrorKind::InvalidHeader(
            "dict element region did not align to declared length",
        )));
    }

    Ok(Value::Dict(key.clone(), value.clone(), pairs))
}

fn read_string(reader: &mut Reader<'_>) -> Result<String> {
    let len = reader.read_u32()? as usize;
    let bytes = reader.read_bytes(len)?;

    if reader.read_u8()? != 0 {
        return Err(Error::new(ErrorKind::InvalidValue(
            "string was not NUL terminated",
        )));
    }

    Ok(std::str::from_utf8(bytes)?.to_owned())
}

pub(crate) fn read_signature(reader: &mut Reader<'_>) -> Result<Signature> {
    let len = reader.read_u8()? as usize;
    let bytes = reader.read_bytes(len)?;

    if reader.read_u8()? != 0 {
        return Err(Error::new(ErrorKind::InvalidValue(
            "signature was not NUL terminated",
        )));
    }

    let s = std::str::from_utf8(bytes)?;
    Ok(Signature::new(s)?)
}

/// Write `value` to `writer`, aligning first.
pub(crate) fn write_value(writer: &mut Writer, value: &Value) -> Result<()> {
    let ty = value.ty();
    writer.align(ty.alignment());

    match value {
        Value::Byte(b) => writer.write_u8(*b),
        Value::Boolean(b) => writer.write_u32(if *b { 1 } else { 0 }),
        Value::Int16(v) => writer.write_i16(*v),
        Value::UInt16(v) => writer.write_u16(*v),
        Value::Int32(v) => writer.write_i32(*v),
        Value::UInt32(v) => writer.write_u32(*v),
        Value::Int64(v) => writer.write_i64(*v),
        Value::UInt64(v) => writer.write_u64(*v),
        Value::Double(v) => writer.write_f64(*v),
        Value::String(s) => write_string(writer, s),
        Value::ObjectPath(p) => write_string(writer, p.as_str()),
        Value::Signature(sig) => write_signature(writer, sig.as_str())?,
        Value::UnixFd(idx) => writer.write_u32(*idx),
        Value::Variant(inner) => {
            let inner_ty = inner.ty();
            write_signature(writer, &inner_ty.to_string())?;
            write_value(writer, inner)?;
        }
        Value::Array(elem, items) => write_array_region(writer, elem, items)?,
        Value::Struct(fields) => {
            writer.align(8);

            for field in fields {
                write_value(writer, field)?;
            }
        }
        Value::Dict(key, value_ty, pairs) => write_dict_region(writer, key, value_ty, pairs)?,
    }

    Ok(())
}

fn write_array_region(writer: &mut Writer, elem: &Type, items: &[Value]) -> Result<()> {
    writer.align(4);
    let len_at = writer.reserve_u32();
    writer.align(elem.alignment());
    let start = writer.position();

    for item in items {
        write_value(writer, item)?;
    }

    let len = writer.position() - start;

    if len as u64 > MAX_ARRAY_LEN as u64 {
        return Err(Error::new(ErrorKind::ArrayTooLong(len as u32)));
    }

    writer.patch_u32(len_at, len as u32);
    Ok(())
}

fn write_dict_region(
    writer: &mut Writer,
    key: &Type,
    value_ty: &Type,
    pairs: &[(Value, Value)],
) -> Result<()> {
    writer.align(4);
    let len_at = writer.reserve_u32();
    writer.align(8);
    let start = writer.position();

    for (k, v) in pairs {
        writer.align(8);
        write_value(writer, k)?;
        debug_assert_eq!(&k.ty(), key);
        write_value(writer, v)?;
        debug_assert_eq!(&v.ty(), value_ty);
    }

    let len = writer.position() - start;

    if len as u64 > MAX_ARRAY_LEN as u64 {
        return Err(Error::new(ErrorKind::ArrayTooLong(len as u32)));
    }

    writer.patch_u32(len_at, len as u32);
    Ok(())
}

fn write_string(writer: &mut Writer, s: &str) {
    writer.write_u32(s.len() as u32);
    writer.write_bytes(s.as_bytes());
    writer.write_u8(0);
}

pub(crate) fn write_signature(writer: &mut Writer, s: &str) -> Result<()> {
    if s.len() > crate::signature::MAX_SIGNATURE_LEN {
        return Err(Error::new(ErrorKind::Signature(
            crate::signature::SignatureError::TooLong,
        )));
    }

    writer.write_u8(s.len() as u8);
    writer.write_bytes(s.as_bytes());
    writer.write_u8(0);
    Ok(())
}

/// Read one value of each type in `types`, in order, from `reader`.
pub(crate) fn read_values(reader: &mut Reader<'_>, types: &[Type]) -> Result<Vec<Value>> {
    types.iter().map(|ty| read_value(reader, ty)).collect()
}

/// Write a sequence of values in order.
pub(crate) fn write_values(writer: &mut Writer, values: &[Value]) -> Result<()> {
    for value in values {
        write_value(writer, value)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Endianness;

    fn round_trip(value: Value, endianness: Endianness) {
        let mut writer = Writer::new(endianness);
        write_value(&mut writer, &value).unwrap();
        let bytes = writer.into_vec();

        let ty = value.ty();
        let mut reader = Reader::new(&bytes, endianness);
        let decoded = read_value(&mut reader, &ty).unwrap();

        assert_eq!(decoded, value);
        assert_eq!(reader.position(), bytes.len());
    }

    #[test]
    fn scalars_round_trip_both_endiannesses() {
        for endianness in [Endianness::Little, Endianness::Big] {
            round_trip(Value::Byte(7), endianness);
            round_trip(Value::Boolean(true), endianness);
            round_trip(Value::Boolean(false), endianness);
            round_trip(Value::Int16(-30), endianness);
            round_trip(Value::UInt16(30), endianness);
            round_trip(Value::Int32(-123456), endianness);
            round_trip(Value::UInt32(123456), endianness);
            round_trip(Value::Int64(-123456789012), endianness);
            round_trip(Value::UInt64(123456789012), endianness);
            round_trip(Value::Double(36.6), endianness);
            round_trip(Value::str("hello world"), endianness);
            round_trip(
                Value::ObjectPath(ObjectPath::new("/org/freedesktop/DBus").unwrap()),
                endianness,
            );
            round_trip(Value::Signature(Signature::new("a{sv}").unwrap()), endianness);
            round_trip(Value::UnixFd(3), endianness);
        }
    }

    #[test]
    fn empty_array_round_trips_with_padding() {
        let value = Value::Array(Type::UInt64, vec![]);
        let mut writer = Writer::new(Endianness::Little);
        write_value(&mut writer, &value).unwrap();
        let bytes = writer.into_vec();
        // length (u32) + 4 bytes padding to reach 8-alignment for u64 elements.
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 0]);

        let mut reader = Reader::new(&bytes, Endianness::Little);
        let decoded = read_value(&mut reader, &value.ty()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn nested_struct_and_array() {
        let value = Value::Struct(vec![
            Value::Byte(10),
            Value::UInt16(10),
            Value::Array(Type::Byte, vec![Value::Byte(1), Value::Byte(2), Value::Byte(3)]),
            Value::str("Hello World"),
        ]);

        round_trip(value, Endianness::Little);
    }

    #[test]
    fn variant_round_trips() {
        round_trip(Value::Variant(Box::new(Value::UInt32(42))), Endianness::Little);
        round_trip(
            Value::Variant(Box::new(Value::str("nested"))),
            Endianness::Big,
        );
    }

    #[test]
    fn dict_round_trips_and_merges_entries() {
        let pairs = vec![
            (Value::str("a"), Value::UInt32(1)),
            (Value::str("b"), Value::UInt32(2)),
        ];
        let value = Value::Dict(Type::String, Type::UInt32, pairs);
        round_trip(value, Endianness::Little);
    }

    #[test]
    fn boolean_rejects_invalid_wire_value() {
        let bytes = 2u32.to_le_bytes();
        let mut reader = Reader::new(&bytes, Endianness::Little);
        assert!(read_value(&mut reader, &Type::Boolean).is_err());
    }

    #[test]
    fn array_too_long_is_rejected() {
        let mut writer = Writer::new(Endianness::Little);
        writer.write_u32(MAX_ARRAY_LEN + 1);
        let bytes = writer.into_vec();
        let mut reader = Reader::new(&bytes, Endianness::Little);
        let err = read_value(&mut reader, &Type::array(Type::Byte)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ArrayTooLong(_)));
    }
}
