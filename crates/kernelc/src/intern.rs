//! Interned identifier storage.
//!
//! Source identifiers (argument names, declared variable names, member
//! names) are stored once and referred to everywhere else by a small
//! copyable id. This keeps the AST and the declaration/dependency tables
//! free of repeated string allocations.

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A handle to an interned string.
///
/// `StringId` values are only meaningful relative to the [`Interner`] that
/// produced them; there is no global namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StringId(u32);

impl StringId {
    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("interner holds fewer than u32::MAX strings"))
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deduplicating string table.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StringId>,
}

impl Serialize for Interner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.strings.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Interner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let strings: Vec<Box<str>> = Vec::deserialize(deserializer)?;
        let mut lookup = AHashMap::with_capacity(strings.len());
        for (index, text) in strings.iter().enumerate() {
            lookup.insert(text.clone(), StringId::from_index(index));
        }
        Ok(Self { strings, lookup })
    }
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the same id for equal strings.
    pub fn intern(&mut self, text: &str) -> StringId {
        if let Some(id) = self.lookup.get(text) {
            return *id;
        }
        let id = StringId::from_index(self.strings.len());
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    /// Resolves a previously interned id back to its text.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this interner.
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Looks up `text` without interning it, for callers that must not
    /// grow the table just to check membership.
    pub fn get(&self, text: &str) -> Option<StringId> {
        self.lookup.get(text).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("value");
        let b = interner.intern("value");
        let c = interner.intern("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "value");
        assert_eq!(interner.resolve(c), "other");
    }
}
