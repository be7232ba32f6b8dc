//! Purpose: Hold variant-specific fields as opaque, undecoded JSON spans.
//! Exports: `Fragment`, `Fragments`, `Presence`.
//! Role: Deferred half of an envelope; promoters pull typed values out on demand.
//! Invariants: Fragments are never type-checked until a promoter asks for them.
//! Invariants: Lookups are read-only; decoding a fragment never mutates the envelope.
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use time::OffsetDateTime;

use crate::core::error::{Error, ErrorKind};

/// One undecoded JSON value, kept exactly as it appeared in the payload.
#[derive(Clone, Debug)]
pub struct Fragment(Box<RawValue>);

impl Fragment {
    pub(crate) fn new(raw: Box<RawValue>) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &str {
        self.0.get()
    }

    pub fn is_null(&self) -> bool {
        self.raw().trim() == "null"
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.raw())
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Three-way view of a fragment slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Presence<'a> {
    Absent,
    Null,
    Value(&'a Fragment),
}

/// Variant-specific fields keyed by wire name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragments(BTreeMap<String, Fragment>);

impl Fragments {
    pub(crate) fn insert(&mut self, name: String, fragment: Fragment) {
        // Duplicate keys: the last occurrence in the object wins.
        self.0.insert(name, fragment);
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fragment)> {
        self.0.iter().map(|(name, fragment)| (name.as_str(), fragment))
    }

    pub fn presence(&self, name: &str) -> Presence<'_> {
        match self.0.get(name) {
            None => Presence::Absent,
            Some(fragment) if fragment.is_null() => Presence::Null,
            Some(fragment) => Presence::Value(fragment),
        }
    }

    /// Decode a field the variant cannot exist without. `null` does not satisfy it.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        match self.presence(name) {
            Presence::Absent => Err(Error::new(ErrorKind::MissingField)
                .with_message("required field is absent")
                .with_field(name)),
            Presence::Null => Err(Error::new(ErrorKind::MalformedField)
                .with_message("required field is null")
                .with_field(name)),
            Presence::Value(fragment) => decode_fragment(fragment, name),
        }
    }

    /// Decode a field that falls back to `T::default()` when absent or null.
    pub fn optional<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, Error> {
        Ok(self.nullable(name)?.unwrap_or_default())
    }

    /// Decode a field whose absence is meaningful to the caller.
    pub fn nullable<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, Error> {
        match self.presence(name) {
            Presence::Absent | Presence::Null => Ok(None),
            Presence::Value(fragment) => decode_fragment(fragment, name).map(Some),
        }
    }

    /// Decode an optional RFC 3339 timestamp.
    pub fn timestamp(&self, name: &str) -> Result<Option<OffsetDateTime>, Error> {
        Ok(self.nullable::<Rfc3339>(name)?.map(|ts| ts.0))
    }
}

impl Serialize for Fragments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

fn decode_fragment<T: DeserializeOwned>(fragment: &Fragment, name: &str) -> Result<T, Error> {
    fragment.decode().map_err(|err| {
        Error::new(ErrorKind::MalformedField)
            .with_message(format!("field has an unexpected shape: {err}"))
            .with_field(name)
            .with_source(err)
    })
}

#[derive(Deserialize)]
#[serde(transparent)]
pub(crate) struct Rfc3339(#[serde(with = "time::serde::rfc3339")] pub(crate) OffsetDateTime);
