//! Purpose: Compact tagged binary form of `DynamicValue` (tag byte + tag-specific payload).
//! Exports: `encode`, `encode_into`, `decode`, `MAX_DEPTH`, `MAX_LEN`.
//! Role: Versionless byte layout for values that leave the process as buffers.
//! Invariants: Numerics are fixed-width little-endian; lengths and counts are `u32` prefixes.
//! Invariants: `Invalid` is never written; decode rejects trailing bytes and duplicate keys.
//! Invariants: Encode and decode share `MAX_DEPTH`, so anything encoded decodes back.
use std::collections::HashSet;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::core::error::{Error, ErrorKind};
use crate::core::value::{DynamicValue, ValueTag};

pub const MAX_DEPTH: usize = 128;
pub const MAX_LEN: usize = 256 * 1024 * 1024;

pub fn encode(value: &DynamicValue) -> Result<Bytes, Error> {
    let mut out = BytesMut::with_capacity(64);
    encode_into(value, &mut out)?;
    Ok(out.freeze())
}

pub fn encode_into(value: &DynamicValue, out: &mut BytesMut) -> Result<(), Error> {
    encode_value(value, out, 0)
}

fn encode_value(value: &DynamicValue, out: &mut BytesMut, depth: usize) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(Error::new(ErrorKind::Usage).with_message("value nesting too deep to encode"));
    }
    out.put_u8(value.tag() as u8);
    match value {
        DynamicValue::Null => {}
        DynamicValue::Bool(v) => out.put_u8(u8::from(*v)),
        DynamicValue::Int32(v) => out.put_i32_le(*v),
        DynamicValue::Int64(v) => out.put_i64_le(*v),
        DynamicValue::Float32(v) => out.put_f32_le(*v),
        DynamicValue::Float64(v) => out.put_f64_le(*v),
        DynamicValue::String(v) => put_bytes(out, v.as_bytes())?,
        DynamicValue::Binary(v) => put_bytes(out, v)?,
        DynamicValue::Array(items) => {
            put_len(out, items.len())?;
            for item in items {
                encode_value(item, out, depth + 1)?;
            }
        }
        DynamicValue::Object(entries) => {
            put_len(out, entries.len())?;
            for (key, item) in entries {
                put_bytes(out, key.as_bytes())?;
                encode_value(item, out, depth + 1)?;
            }
        }
        DynamicValue::Invalid => {
            return Err(Error::new(ErrorKind::Usage).with_message("cannot encode invalid value"));
        }
    }
    Ok(())
}

pub fn decode(bytes: &[u8]) -> Result<DynamicValue, Error> {
    let mut buf = bytes;
    let value = decode_value(&mut buf, 0)?;
    if buf.has_remaining() {
        return Err(corrupt("trailing bytes after value"));
    }
    Ok(value)
}

fn decode_value<'a>(buf: &mut &'a [u8], depth: usize) -> Result<DynamicValue, Error> {
    if depth > MAX_DEPTH {
        return Err(corrupt("value nesting too deep"));
    }
    let raw = take_u8(buf)?;
    let tag = ValueTag::from_u8(raw).ok_or_else(|| corrupt(format!("unknown tag {raw}")))?;
    let value = match tag {
        ValueTag::Null => DynamicValue::Null,
        ValueTag::Bool => match take_u8(buf)? {
            0 => DynamicValue::Bool(false),
            1 => DynamicValue::Bool(true),
            other => return Err(corrupt(format!("invalid bool byte {other}"))),
        },
        ValueTag::Int32 => {
            need(buf, 4)?;
            DynamicValue::Int32(buf.get_i32_le())
        }
        ValueTag::Int64 => {
            need(buf, 8)?;
            DynamicValue::Int64(buf.get_i64_le())
        }
        ValueTag::Float32 => {
            need(buf, 4)?;
            DynamicValue::Float32(buf.get_f32_le())
        }
        ValueTag::Float64 => {
            need(buf, 8)?;
            DynamicValue::Float64(buf.get_f64_le())
        }
        ValueTag::String => DynamicValue::String(take_str(buf)?.to_string()),
        ValueTag::Binary => {
            let len = take_len(buf)?;
            need(buf, len)?;
            DynamicValue::Binary(buf.copy_to_bytes(len))
        }
        ValueTag::Array => {
            let count = take_len(buf)?;
            // Every item is at least one tag byte.
            need(buf, count)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_value(buf, depth + 1)?);
            }
            DynamicValue::Array(items)
        }
        ValueTag::Object => {
            let count = take_len(buf)?;
            need(buf, count)?;
            let mut entries: Vec<(String, DynamicValue)> = Vec::with_capacity(count);
            let mut seen: HashSet<&'a str> = HashSet::with_capacity(count);
            for _ in 0..count {
                let key = take_str(buf)?;
                if !seen.insert(key) {
                    return Err(corrupt(format!("duplicate object key {key:?}")));
                }
                let item = decode_value(buf, depth + 1)?;
                entries.push((key.to_string(), item));
            }
            DynamicValue::Object(entries)
        }
        ValueTag::Invalid => return Err(corrupt("invalid tag on the wire")),
    };
    Ok(value)
}

fn put_len(out: &mut BytesMut, len: usize) -> Result<(), Error> {
    if len > MAX_LEN {
        return Err(Error::new(ErrorKind::Usage).with_message("value length exceeds max"));
    }
    out.put_u32_le(len as u32);
    Ok(())
}

fn put_bytes(out: &mut BytesMut, bytes: &[u8]) -> Result<(), Error> {
    put_len(out, bytes.len())?;
    out.put_slice(bytes);
    Ok(())
}

fn need(buf: &&[u8], len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(corrupt("truncated value"));
    }
    Ok(())
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, Error> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn take_len(buf: &mut &[u8]) -> Result<usize, Error> {
    need(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    if len > MAX_LEN {
        return Err(corrupt("declared length exceeds max"));
    }
    Ok(len)
}

/// Borrows a length-prefixed UTF-8 string straight from the input.
fn take_str<'a>(buf: &mut &'a [u8]) -> Result<&'a str, Error> {
    let len = take_len(buf)?;
    need(buf, len)?;
    let input: &'a [u8] = *buf;
    let (head, rest) = input.split_at(len);
    let text = std::str::from_utf8(head)
        .map_err(|err| corrupt("invalid utf-8 in string").with_source(err))?;
    *buf = rest;
    Ok(text)
}

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Corrupt).with_message(message)
}

#[cfg(test)]
mod tests {
    use super::{MAX_DEPTH, decode, encode};
    use crate::core::error::ErrorKind;
    use crate::core::value::DynamicValue;

    fn sample() -> DynamicValue {
        let mut obj = DynamicValue::object();
        obj.set("contextId", DynamicValue::string("abc123")).unwrap();
        obj.set("limit", DynamicValue::Int64(10)).unwrap();
        obj.set("ratio", DynamicValue::Float32(0.5)).unwrap();
        obj.set("meta", DynamicValue::binary(vec![0u8, 255, 7])).unwrap();
        let mut arr = DynamicValue::array();
        arr.push(DynamicValue::Null).unwrap();
        arr.push(DynamicValue::Int32(-3)).unwrap();
        arr.push(obj).unwrap();
        arr.push(DynamicValue::Float64(f64::MIN_POSITIVE)).unwrap();
        arr.push(DynamicValue::Bool(true)).unwrap();
        arr
    }

    #[test]
    fn nested_value_survives_round_trip() {
        let value = sample();
        let bytes = encode(&value).expect("encode");
        assert_eq!(bytes[0], 8);
        assert_eq!(decode(&bytes).expect("decode"), value);
    }

    #[test]
    fn int64_payload_is_little_endian() {
        let bytes = encode(&DynamicValue::Int64(1)).expect("encode");
        assert_eq!(&bytes[..], &[3, 1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn truncated_and_trailing_input_is_corrupt() {
        let bytes = encode(&sample()).expect("encode");
        let err = decode(&bytes[..bytes.len() - 1]).expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let mut longer = bytes.to_vec();
        longer.push(0);
        let err = decode(&longer).expect_err("trailing");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn unknown_tag_and_invalid_sentinel_are_rejected() {
        assert_eq!(decode(&[42]).expect_err("tag").kind(), ErrorKind::Corrupt);
        assert_eq!(decode(&[255]).expect_err("invalid").kind(), ErrorKind::Corrupt);
        let err = encode(&DynamicValue::Invalid).expect_err("encode invalid");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut bytes = vec![9, 2, 0, 0, 0];
        for _ in 0..2 {
            bytes.extend_from_slice(&[1, 0, 0, 0, b'k', 0]);
        }
        let err = decode(&bytes).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate object key"));
    }

    #[test]
    fn depth_limit_applies_to_encode_and_decode() {
        let mut value = DynamicValue::Null;
        for _ in 0..MAX_DEPTH {
            value = DynamicValue::Array(vec![value]);
        }
        let bytes = encode(&value).expect("deepest encodable value");
        assert_eq!(decode(&bytes).expect("decodes back"), value);

        let deeper = DynamicValue::Array(vec![value]);
        let err = encode(&deeper).expect_err("too deep to encode");
        assert_eq!(err.kind(), ErrorKind::Usage);

        // Hand-built nesting past the limit is still rejected on the way in.
        let mut raw = Vec::new();
        for _ in 0..=MAX_DEPTH {
            raw.extend_from_slice(&[8, 1, 0, 0, 0]);
        }
        raw.push(0);
        assert_eq!(decode(&raw).expect_err("too deep").kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn wide_object_decodes_and_late_duplicate_is_found() {
        let obj = DynamicValue::Object(
            (0..20_000)
                .map(|i| (format!("k{i}"), DynamicValue::Int32(i)))
                .collect(),
        );
        let bytes = encode(&obj).expect("encode");
        assert_eq!(decode(&bytes).expect("decode"), obj);

        // Rename the last key to collide with an earlier key of the same length.
        let mut raw = bytes.to_vec();
        let last_key = b"k19999";
        let at = raw
            .windows(last_key.len())
            .rposition(|window| window == last_key)
            .expect("last key");
        raw[at..at + last_key.len()].copy_from_slice(b"k10000");
        let err = decode(&raw).expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
