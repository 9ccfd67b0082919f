//! Purpose: Closed tagged union that is the only data shape crossing the native boundary.
//! Exports: `DynamicValue`, `ValueTag`, `ObjectIter`.
//! Role: In-memory model behind every `pbx_value` handle and every Mapper conversion.
//! Invariants: Each value owns its children exclusively (a tree); dropping frees each once.
//! Invariants: Object keys are unique; lookup ignores order, iteration follows insertion.
//! Invariants: Numeric tags are exact; accessors never widen or narrow.
use bytes::Bytes;

use crate::core::error::{Error, ErrorKind};

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueTag {
    Null = 0,
    Bool = 1,
    Int32 = 2,
    Int64 = 3,
    Float32 = 4,
    Float64 = 5,
    String = 6,
    Binary = 7,
    Array = 8,
    Object = 9,
    Invalid = 255,
}

impl ValueTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ValueTag::Null),
            1 => Some(ValueTag::Bool),
            2 => Some(ValueTag::Int32),
            3 => Some(ValueTag::Int64),
            4 => Some(ValueTag::Float32),
            5 => Some(ValueTag::Float64),
            6 => Some(ValueTag::String),
            7 => Some(ValueTag::Binary),
            8 => Some(ValueTag::Array),
            9 => Some(ValueTag::Object),
            255 => Some(ValueTag::Invalid),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Binary(Bytes),
    Array(Vec<DynamicValue>),
    Object(Vec<(String, DynamicValue)>),
    /// Decode failure sentinel; never built on purpose.
    Invalid,
}

impl DynamicValue {
    pub fn array() -> Self {
        DynamicValue::Array(Vec::new())
    }

    pub fn object() -> Self {
        DynamicValue::Object(Vec::new())
    }

    pub fn string(value: impl Into<String>) -> Self {
        DynamicValue::String(value.into())
    }

    pub fn binary(value: impl Into<Bytes>) -> Self {
        DynamicValue::Binary(value.into())
    }

    pub fn tag(&self) -> ValueTag {
        match self {
            DynamicValue::Null => ValueTag::Null,
            DynamicValue::Bool(_) => ValueTag::Bool,
            DynamicValue::Int32(_) => ValueTag::Int32,
            DynamicValue::Int64(_) => ValueTag::Int64,
            DynamicValue::Float32(_) => ValueTag::Float32,
            DynamicValue::Float64(_) => ValueTag::Float64,
            DynamicValue::String(_) => ValueTag::String,
            DynamicValue::Binary(_) => ValueTag::Binary,
            DynamicValue::Array(_) => ValueTag::Array,
            DynamicValue::Object(_) => ValueTag::Object,
            DynamicValue::Invalid => ValueTag::Invalid,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Appends `item`, taking ownership of it.
    pub fn push(&mut self, item: DynamicValue) -> Result<(), Error> {
        match self {
            DynamicValue::Array(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(wrong_tag(ValueTag::Array, other.tag())),
        }
    }

    /// Sets `key` to `item`, taking ownership of it. An existing entry is replaced in place.
    pub fn set(&mut self, key: impl Into<String>, item: DynamicValue) -> Result<(), Error> {
        match self {
            DynamicValue::Object(entries) => {
                let key = key.into();
                match entries.iter_mut().find(|(existing, _)| *existing == key) {
                    Some((_, slot)) => *slot = item,
                    None => entries.push((key, item)),
                }
                Ok(())
            }
            other => Err(wrong_tag(ValueTag::Object, other.tag())),
        }
    }

    /// Looks up `key` on an object; `None` for missing keys and for non-objects.
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        match self {
            DynamicValue::Object(entries) => entries
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            DynamicValue::Bool(value) => Ok(*value),
            other => Err(wrong_tag(ValueTag::Bool, other.tag())),
        }
    }

    pub fn as_i32(&self) -> Result<i32, Error> {
        match self {
            DynamicValue::Int32(value) => Ok(*value),
            other => Err(wrong_tag(ValueTag::Int32, other.tag())),
        }
    }

    pub fn as_i64(&self) -> Result<i64, Error> {
        match self {
            DynamicValue::Int64(value) => Ok(*value),
            other => Err(wrong_tag(ValueTag::Int64, other.tag())),
        }
    }

    pub fn as_f32(&self) -> Result<f32, Error> {
        match self {
            DynamicValue::Float32(value) => Ok(*value),
            other => Err(wrong_tag(ValueTag::Float32, other.tag())),
        }
    }

    pub fn as_f64(&self) -> Result<f64, Error> {
        match self {
            DynamicValue::Float64(value) => Ok(*value),
            other => Err(wrong_tag(ValueTag::Float64, other.tag())),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            DynamicValue::String(value) => Ok(value),
            other => Err(wrong_tag(ValueTag::String, other.tag())),
        }
    }

    pub fn as_binary(&self) -> Result<&Bytes, Error> {
        match self {
            DynamicValue::Binary(value) => Ok(value),
            other => Err(wrong_tag(ValueTag::Binary, other.tag())),
        }
    }

    pub fn as_array(&self) -> Result<&[DynamicValue], Error> {
        match self {
            DynamicValue::Array(items) => Ok(items),
            other => Err(wrong_tag(ValueTag::Array, other.tag())),
        }
    }

    pub fn as_object(&self) -> Result<&[(String, DynamicValue)], Error> {
        match self {
            DynamicValue::Object(entries) => Ok(entries),
            other => Err(wrong_tag(ValueTag::Object, other.tag())),
        }
    }

    /// Opens a fresh one-shot iterator over an object's entries.
    pub fn object_iter(&self) -> Result<ObjectIter<'_>, Error> {
        Ok(ObjectIter {
            entries: self.as_object()?,
            pos: 0,
        })
    }
}

/// One-shot traversal over `(key, value)` pairs; not restartable.
#[derive(Debug)]
pub struct ObjectIter<'a> {
    entries: &'a [(String, DynamicValue)],
    pos: usize,
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = (&'a str, &'a DynamicValue);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.entries.get(self.pos)?;
        self.pos += 1;
        Some((key.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ObjectIter<'_> {}

pub(crate) fn wrong_tag(expected: ValueTag, found: ValueTag) -> Error {
    Error::new(ErrorKind::WrongTag).with_message(format!("expected {expected:?}, found {found:?}"))
}

#[cfg(test)]
mod tests {
    use super::{DynamicValue, ValueTag};
    use crate::core::error::ErrorKind;

    #[test]
    fn accessors_reject_mismatched_tags() {
        let value = DynamicValue::Int32(7);
        assert_eq!(value.as_i32().expect("i32"), 7);
        let err = value.as_i64().expect_err("no widening");
        assert_eq!(err.kind(), ErrorKind::WrongTag);
        assert!(err.to_string().contains("expected Int64, found Int32"));
    }

    #[test]
    fn set_replaces_existing_key_in_place() {
        let mut obj = DynamicValue::object();
        obj.set("a", DynamicValue::Int64(1)).expect("set a");
        obj.set("b", DynamicValue::Bool(true)).expect("set b");
        obj.set("a", DynamicValue::string("x")).expect("replace a");

        let keys: Vec<_> = obj.object_iter().expect("iter").map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(obj.get("a"), Some(&DynamicValue::string("x")));
        assert_eq!(obj.get("missing"), None);
    }

    #[test]
    fn object_iterator_is_one_shot_and_complete() {
        let mut obj = DynamicValue::object();
        for (i, key) in ["x", "y", "z"].iter().enumerate() {
            obj.set(*key, DynamicValue::Int32(i as i32)).expect("set");
        }
        let mut iter = obj.object_iter().expect("iter");
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.by_ref().count(), 3);
        assert!(iter.next().is_none());
        assert_eq!(obj.object_iter().expect("fresh iter").count(), 3);
    }

    #[test]
    fn mutators_require_container_tags() {
        let mut scalar = DynamicValue::Bool(false);
        let err = scalar.push(DynamicValue::Null).expect_err("not array");
        assert_eq!(err.kind(), ErrorKind::WrongTag);
        let err = scalar.set("k", DynamicValue::Null).expect_err("not object");
        assert_eq!(err.kind(), ErrorKind::WrongTag);
        assert!(scalar.object_iter().is_err());
    }

    #[test]
    fn tag_bytes_round_trip() {
        for tag in [
            ValueTag::Null,
            ValueTag::Bool,
            ValueTag::Int32,
            ValueTag::Int64,
            ValueTag::Float32,
            ValueTag::Float64,
            ValueTag::String,
            ValueTag::Binary,
            ValueTag::Array,
            ValueTag::Object,
            ValueTag::Invalid,
        ] {
            assert_eq!(ValueTag::from_u8(tag as u8), Some(tag));
        }
        assert_eq!(ValueTag::from_u8(42), None);
    }
}
