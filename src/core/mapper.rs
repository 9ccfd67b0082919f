//! Purpose: Convert typed Rust values to and from `DynamicValue` trees.
//! Exports: `Encode`, `Decode`, `Record`, `DecodeContext`, `decode`, `encode_record`,
//!          `decode_record`, `camel_case`, `pascal_case`, and the `record!` macro.
//! Role: The only place that knows how managed shapes map onto wire shapes.
//! Invariants: Record fields go out under camelCase keys and come back via PascalCase lookup.
//! Invariants: Unknown object keys are skipped on decode; every known field is emitted on encode.
//! Invariants: A field marked `(required)` that is absent or null fails decode with its key.
//! Invariants: Null decodes to the target's default (absent/empty) regardless of the target.
//! Invariants: Byte buffers are `Bytes` and map to `Binary`; any other sequence maps to `Array`.
use std::any::Any;

use bytes::Bytes;
use tracing::trace;

use crate::core::error::Error;
use crate::core::registry::TypeRegistry;
use crate::core::value::DynamicValue;

/// Registry erased to `Any` so that polymorphic targets defined outside `core` can look up
/// their own `TypeRegistry<T>`.
pub type ErasedRegistry = dyn Any + Send + Sync;

/// Decode-time state handed down explicitly instead of read from globals.
#[derive(Clone, Copy, Debug)]
pub struct DecodeContext<'r> {
    registry: Option<&'r ErasedRegistry>,
}

impl<'r> DecodeContext<'r> {
    pub fn new<T: 'static>(registry: &'r TypeRegistry<T>) -> Self {
        Self {
            registry: Some(registry as &ErasedRegistry),
        }
    }

    /// Context without a registry; polymorphic targets fall back to their base shape.
    pub fn detached() -> Self {
        Self { registry: None }
    }

    pub(crate) fn from_erased(registry: Option<&'r ErasedRegistry>) -> Self {
        Self { registry }
    }

    /// The registry for polymorphic target `T`, when one was supplied.
    pub fn registry<T: 'static>(&self) -> Option<&'r TypeRegistry<T>> {
        self.registry.and_then(|registry| registry.downcast_ref())
    }
}

pub trait Encode {
    fn encode(&self) -> DynamicValue;
}

pub trait Decode: Default {
    /// Builds `Self` from a non-null value. Callers go through [`decode`].
    fn from_value(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error>;
}

/// Decodes `value` as `T`; shape mismatches surface as `ErrorKind::Protocol`.
pub fn decode<T: Decode>(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<T, Error> {
    if value.is_null() {
        return Ok(T::default());
    }
    T::from_value(value, cx).map_err(|err| err.into_protocol("unexpected value shape"))
}

/// Field table for a record type, usually generated by [`record!`](crate::record).
pub trait Record: Default {
    /// Field names in PascalCase, in emit order.
    const FIELDS: &'static [&'static str];

    /// Subset of `FIELDS` that must arrive non-null.
    const REQUIRED: &'static [&'static str] = &[];

    fn get_field(&self, name: &str) -> Option<DynamicValue>;

    /// Returns `Ok(false)` when `name` is not a field of this record.
    fn set_field(
        &mut self,
        name: &str,
        value: &DynamicValue,
        cx: &DecodeContext<'_>,
    ) -> Result<bool, Error>;
}

pub fn encode_record<R: Record>(record: &R) -> DynamicValue {
    let mut entries = Vec::with_capacity(R::FIELDS.len());
    for name in R::FIELDS {
        if let Some(value) = record.get_field(name) {
            entries.push((camel_case(name), value));
        }
    }
    DynamicValue::Object(entries)
}

pub fn decode_record<R: Record>(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<R, Error> {
    let mut record = R::default();
    let mut missing: Vec<&'static str> = R::REQUIRED.to_vec();
    for (key, item) in value.object_iter()? {
        let name = pascal_case(key);
        let known = record
            .set_field(&name, item, cx)
            .map_err(|err| err.with_key(key))?;
        if !known {
            trace!(key, record = std::any::type_name::<R>(), "skipping unknown key");
        } else if !item.is_null() {
            missing.retain(|field| *field != name);
        }
    }
    if let Some(field) = missing.first() {
        return Err(Error::protocol(format!(
            "required field missing from {}",
            std::any::type_name::<R>()
        ))
        .with_key(camel_case(field)));
    }
    Ok(record)
}

pub fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn pascal_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Implements [`Record`], [`Encode`] and [`Decode`] for a struct from a
/// `PascalName => rust_field` table. `PascalName(required) => rust_field` marks a
/// field whose absence is a decode error.
#[macro_export]
macro_rules! record {
    ($ty:ty { $($name:ident $(($marker:ident))? => $field:ident),+ $(,)? }) => {
        impl $crate::core::mapper::Record for $ty {
            const FIELDS: &'static [&'static str] = &[$(stringify!($name)),+];
            const REQUIRED: &'static [&'static str] =
                &[$($($crate::__record_marker!($marker, $name),)?)+];

            fn get_field(
                &self,
                name: &str,
            ) -> ::core::option::Option<$crate::core::value::DynamicValue> {
                $(
                    if name == stringify!($name) {
                        return ::core::option::Option::Some(
                            $crate::core::mapper::Encode::encode(&self.$field),
                        );
                    }
                )+
                ::core::option::Option::None
            }

            fn set_field(
                &mut self,
                name: &str,
                value: &$crate::core::value::DynamicValue,
                cx: &$crate::core::mapper::DecodeContext<'_>,
            ) -> ::core::result::Result<bool, $crate::core::error::Error> {
                $(
                    if name == stringify!($name) {
                        self.$field = $crate::core::mapper::decode(value, cx)?;
                        return ::core::result::Result::Ok(true);
                    }
                )+
                ::core::result::Result::Ok(false)
            }
        }

        impl $crate::core::mapper::Encode for $ty {
            fn encode(&self) -> $crate::core::value::DynamicValue {
                $crate::core::mapper::encode_record(self)
            }
        }

        impl $crate::core::mapper::Decode for $ty {
            fn from_value(
                value: &$crate::core::value::DynamicValue,
                cx: &$crate::core::mapper::DecodeContext<'_>,
            ) -> ::core::result::Result<Self, $crate::core::error::Error> {
                $crate::core::mapper::decode_record(value, cx)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_marker {
    (required, $name:ident) => {
        stringify!($name)
    };
}

macro_rules! scalar {
    ($ty:ty, $variant:ident, $accessor:ident) => {
        impl Encode for $ty {
            fn encode(&self) -> DynamicValue {
                DynamicValue::$variant(*self)
            }
        }

        impl Decode for $ty {
            fn from_value(value: &DynamicValue, _cx: &DecodeContext<'_>) -> Result<Self, Error> {
                value.$accessor()
            }
        }
    };
}

scalar!(bool, Bool, as_bool);
scalar!(i32, Int32, as_i32);
scalar!(i64, Int64, as_i64);
scalar!(f32, Float32, as_f32);
scalar!(f64, Float64, as_f64);

impl Encode for str {
    fn encode(&self) -> DynamicValue {
        DynamicValue::String(self.to_string())
    }
}

impl Encode for String {
    fn encode(&self) -> DynamicValue {
        DynamicValue::String(self.clone())
    }
}

impl Decode for String {
    fn from_value(value: &DynamicValue, _cx: &DecodeContext<'_>) -> Result<Self, Error> {
        value.as_str().map(str::to_string)
    }
}

impl Encode for Bytes {
    fn encode(&self) -> DynamicValue {
        DynamicValue::Binary(self.clone())
    }
}

impl Decode for Bytes {
    fn from_value(value: &DynamicValue, _cx: &DecodeContext<'_>) -> Result<Self, Error> {
        value.as_binary().cloned()
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self) -> DynamicValue {
        DynamicValue::Array(self.iter().map(Encode::encode).collect())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> DynamicValue {
        self.as_slice().encode()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn from_value(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error> {
        let items = value.as_array()?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(decode(item, cx)?);
        }
        Ok(out)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> DynamicValue {
        match self {
            Some(value) => value.encode(),
            None => DynamicValue::Null,
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn from_value(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error> {
        T::from_value(value, cx).map(Some)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> DynamicValue {
        (**self).encode()
    }
}

impl Encode for DynamicValue {
    fn encode(&self) -> DynamicValue {
        self.clone()
    }
}

impl Decode for DynamicValue {
    fn from_value(value: &DynamicValue, _cx: &DecodeContext<'_>) -> Result<Self, Error> {
        Ok(value.clone())
    }
}

impl Encode for () {
    fn encode(&self) -> DynamicValue {
        DynamicValue::Null
    }
}

/// Accepts any shape; used for calls whose result is structurally absent.
impl Decode for () {
    fn from_value(_value: &DynamicValue, _cx: &DecodeContext<'_>) -> Result<Self, Error> {
        Ok(())
    }
}
