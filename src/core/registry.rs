//! Purpose: Resolve `"<module>$<TypeName>"` discriminators to concrete decoders.
//! Exports: `TypeRegistry`, `TypeRegistryBuilder`, `Decoder`, `TYPE_KEY`, `discriminator`.
//! Role: Used only while decoding polymorphic object values; `T` is the polymorphic target.
//! Invariants: Discriminators are unique; a built registry is immutable.
//! Invariants: Unknown or missing discriminators are not errors; callers fall back to the hinted type.
//! Notes: Builtin tables and the process-wide instance live next to the target type they decode.
use std::collections::HashMap;
use std::fmt;

use crate::core::error::{Error, ErrorKind};
use crate::core::mapper::DecodeContext;
use crate::core::value::DynamicValue;

/// Object key that carries a discriminator.
pub const TYPE_KEY: &str = "__type";

pub type Decoder<T> = fn(&DynamicValue, &DecodeContext<'_>) -> Result<T, Error>;

pub struct TypeRegistry<T> {
    entries: HashMap<&'static str, Decoder<T>>,
}

impl<T> TypeRegistry<T> {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn builder() -> TypeRegistryBuilder<T> {
        TypeRegistryBuilder {
            entries: HashMap::new(),
        }
    }

    /// Registry over a static table whose discriminators are known to be unique.
    pub fn from_table(table: &[(&'static str, Decoder<T>)]) -> Self {
        let mut entries = HashMap::with_capacity(table.len());
        for (discriminator, decoder) in table {
            let previous = entries.insert(*discriminator, *decoder);
            debug_assert!(previous.is_none(), "duplicate discriminator {discriminator}");
        }
        Self { entries }
    }

    pub fn resolve(&self, discriminator: &str) -> Option<Decoder<T>> {
        self.entries.get(discriminator).copied()
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.entries.contains_key(discriminator)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn discriminators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for TypeRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("TypeRegistry").field("entries", &keys).finish()
    }
}

pub struct TypeRegistryBuilder<T> {
    entries: HashMap<&'static str, Decoder<T>>,
}

impl<T> TypeRegistryBuilder<T> {
    /// Adds every entry of `table`, typically the builtin set for `T`.
    pub fn with_table(mut self, table: &[(&'static str, Decoder<T>)]) -> Self {
        self.entries.extend(table.iter().copied());
        self
    }

    pub fn register(
        mut self,
        discriminator: &'static str,
        decoder: Decoder<T>,
    ) -> Result<Self, Error> {
        if self.entries.contains_key(discriminator) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("discriminator {discriminator:?} already registered")));
        }
        self.entries.insert(discriminator, decoder);
        Ok(self)
    }

    pub fn build(self) -> TypeRegistry<T> {
        TypeRegistry {
            entries: self.entries,
        }
    }
}

/// Reads the discriminator carried by an object value, if any.
pub fn discriminator(value: &DynamicValue) -> Option<&str> {
    value.get(TYPE_KEY).and_then(|tag| tag.as_str().ok())
}
