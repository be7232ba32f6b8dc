//! Purpose: Decode one JSON object into strictly-typed common fields plus opaque fragments.
//! Exports: `Envelope`, `CommonFields`, `decode_array`.
//! Role: Generic decode pass shared by every polymorphic entity kind.
//! Invariants: A single forward pass over the object; fragments are captured as raw spans.
//! Invariants: Only common fields can fail an envelope; fragment shape is never checked here.
//! Invariants: Every failure maps to `ErrorKind::MalformedCommon`, with field/index when known.
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::core::error::{Error, ErrorKind};
use crate::core::fragment::{Fragment, Fragments};
use crate::json::parse;

/// The always-present half of an entity, decoded field by field from a map.
pub trait CommonFields: Sized {
    /// Accumulates common fields while the object is scanned.
    type Builder: Default;

    /// Entity label used in diagnostics ("user", "event").
    const ENTITY: &'static str;

    /// Consume the value for `key` if it is a common field. Returns `false` for
    /// keys that belong to fragments, leaving the value unread.
    fn read_field<'de, A>(builder: &mut Self::Builder, key: &str, map: &mut A) -> Result<bool, A::Error>
    where
        A: MapAccess<'de>;

    /// Finish decoding; `Err` carries the name of a missing required field.
    fn build(builder: Self::Builder) -> Result<Self, &'static str>;
}

/// An entity whose variant is not yet known.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<C> {
    common: C,
    fragments: Fragments,
}

impl<C> Envelope<C> {
    pub fn common(&self) -> &C {
        &self.common
    }

    pub fn fragments(&self) -> &Fragments {
        &self.fragments
    }
}

impl<C: CommonFields> Envelope<C> {
    pub fn decode(input: &[u8]) -> Result<Self, Error> {
        let mut failed_field = None;
        parse::map_from_slice(input, EnvelopeVisitor::<C>::new(&mut failed_field))
            .map_err(|err| malformed_common(err, C::ENTITY, None, failed_field))
    }

    pub fn decode_str(input: &str) -> Result<Self, Error> {
        Self::decode(input.as_bytes())
    }
}

impl<C> Deref for Envelope<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.common
    }
}

/// Serializes the common fields only; fragments are rendered by the variant that owns them.
impl<C: Serialize> Serialize for Envelope<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.common.serialize(serializer)
    }
}

/// Shared back-reference from a promoted variant to the envelope it came from.
///
/// Compares and serializes through the common fields only, so a variant's
/// equality is "same common fields, same typed variant fields".
#[derive(Debug)]
pub(crate) struct Origin<C>(Arc<Envelope<C>>);

impl<C> Origin<C> {
    pub(crate) fn new(envelope: &Arc<Envelope<C>>) -> Self {
        Self(Arc::clone(envelope))
    }

    pub(crate) fn envelope(&self) -> &Arc<Envelope<C>> {
        &self.0
    }
}

impl<C> Clone for Origin<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: PartialEq> PartialEq for Origin<C> {
    fn eq(&self, other: &Self) -> bool {
        self.0.common == other.0.common
    }
}

impl<C: Serialize> Serialize for Origin<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.common.serialize(serializer)
    }
}

/// Decode a JSON array of entities. Any malformed element fails the whole array.
pub fn decode_array<C: CommonFields>(input: &[u8]) -> Result<Vec<Envelope<C>>, Error> {
    let mut failure = None;
    parse::seq_from_slice(input, ArrayVisitor::<C>::new(&mut failure)).map_err(|err| {
        let (index, field) = match failure {
            Some(failure) => (Some(failure.index), failure.field),
            None => (None, None),
        };
        malformed_common(err, C::ENTITY, index, field)
    })
}

/// Read an optional common field; `null` and absence both yield the default.
pub(crate) fn next_or_default<'de, A, T>(map: &mut A) -> Result<T, A::Error>
where
    A: MapAccess<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(map.next_value::<Option<T>>()?.unwrap_or_default())
}

fn malformed_common(
    err: serde_json::Error,
    entity: &str,
    index: Option<usize>,
    field: Option<String>,
) -> Error {
    let mut out = Error::new(ErrorKind::MalformedCommon)
        .with_message(format!("{entity} decode failed: {err}"))
        .with_hint(parse::hint_for_error(&err, entity));
    if let Some(index) = index {
        out = out.with_index(index);
    }
    if let Some(field) = field {
        out = out.with_field(field);
    }
    out.with_source(err)
}

struct EnvelopeVisitor<'a, C> {
    failed_field: &'a mut Option<String>,
    common: PhantomData<C>,
}

impl<'a, C> EnvelopeVisitor<'a, C> {
    fn new(failed_field: &'a mut Option<String>) -> Self {
        Self {
            failed_field,
            common: PhantomData,
        }
    }
}

impl<'de, C: CommonFields> Visitor<'de> for EnvelopeVisitor<'_, C> {
    type Value = Envelope<C>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} object", C::ENTITY)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Envelope<C>, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut builder = C::Builder::default();
        let mut fragments = Fragments::default();
        while let Some(key) = map.next_key::<String>()? {
            match C::read_field(&mut builder, &key, &mut map) {
                Ok(true) => {}
                Ok(false) => {
                    let raw: Box<RawValue> = map.next_value()?;
                    fragments.insert(key, Fragment::new(raw));
                }
                Err(err) => {
                    *self.failed_field = Some(key);
                    return Err(err);
                }
            }
        }
        match C::build(builder) {
            Ok(common) => Ok(Envelope { common, fragments }),
            Err(name) => {
                *self.failed_field = Some(name.to_string());
                Err(de::Error::missing_field(name))
            }
        }
    }
}

impl<'de, C: CommonFields> DeserializeSeed<'de> for EnvelopeVisitor<'_, C> {
    type Value = Envelope<C>;

    fn deserialize<D>(self, deserializer: D) -> Result<Envelope<C>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

struct ElementFailure {
    index: usize,
    field: Option<String>,
}

struct ArrayVisitor<'a, C> {
    failure: &'a mut Option<ElementFailure>,
    common: PhantomData<C>,
}

impl<'a, C> ArrayVisitor<'a, C> {
    fn new(failure: &'a mut Option<ElementFailure>) -> Self {
        Self {
            failure,
            common: PhantomData,
        }
    }
}

impl<'de, C: CommonFields> Visitor<'de> for ArrayVisitor<'_, C> {
    type Value = Vec<Envelope<C>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {} objects", C::ENTITY)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        loop {
            let mut failed_field = None;
            match seq.next_element_seed(EnvelopeVisitor::<C>::new(&mut failed_field)) {
                Ok(Some(envelope)) => out.push(envelope),
                Ok(None) => return Ok(out),
                Err(err) => {
                    *self.failure = Some(ElementFailure {
                        index: out.len(),
                        field: failed_field,
                    });
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommonFields, Envelope, decode_array};
    use crate::core::error::ErrorKind;
    use serde::de::MapAccess;

    #[derive(Debug, PartialEq)]
    struct Probe {
        id: String,
        label: String,
    }

    #[derive(Default)]
    struct ProbeBuilder {
        id: Option<String>,
        label: String,
    }

    impl CommonFields for Probe {
        type Builder = ProbeBuilder;
        const ENTITY: &'static str = "probe";

        fn read_field<'de, A>(b: &mut ProbeBuilder, key: &str, map: &mut A) -> Result<bool, A::Error>
        where
            A: MapAccess<'de>,
        {
            match key {
                "id" => b.id = Some(map.next_value()?),
                "label" => b.label = map.next_value::<Option<String>>()?.unwrap_or_default(),
                _ => return Ok(false),
            }
            Ok(true)
        }

        fn build(b: ProbeBuilder) -> Result<Self, &'static str> {
            Ok(Probe {
                id: b.id.ok_or("id")?,
                label: b.label,
            })
        }
    }

    #[test]
    fn unknown_keys_become_fragments() {
        let env = Envelope::<Probe>::decode(br#"{"id":"p1","extra":{"x":[1, 2]},"n":5}"#)
            .expect("decode");
        assert_eq!(env.id, "p1");
        assert_eq!(env.label, "");
        assert_eq!(env.fragments().len(), 2);
        assert_eq!(env.fragments().get("extra").unwrap().raw(), r#"{"x":[1, 2]}"#);
    }

    #[test]
    fn fragments_with_any_shape_do_not_fail_the_envelope() {
        let env = Envelope::<Probe>::decode(br#"{"id":"p1","width":"wide","height":null}"#)
            .expect("decode");
        assert_eq!(env.fragments().len(), 2);
    }

    #[test]
    fn missing_required_common_field_is_malformed_common() {
        let err = Envelope::<Probe>::decode(br#"{"label":"x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn ill_typed_common_field_names_the_field() {
        let err = Envelope::<Probe>::decode(br#"{"id":7}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn non_object_and_trailing_bytes_are_rejected() {
        let inputs: [&[u8]; 3] = [br#"[1]"#, br#"{"id":"a"} x"#, b"{"];
        for input in inputs {
            let err = Envelope::<Probe>::decode(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedCommon);
        }
    }

    #[test]
    fn array_failure_reports_element_index() {
        let err = decode_array::<Probe>(br#"[{"id":"a"},{"id":"b"},{"label":"c"}]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);
        assert_eq!(err.index(), Some(2));
        assert_eq!(err.field(), Some("id"));

        let ok = decode_array::<Probe>(br#"[{"id":"a"},{"id":"b"}]"#).expect("array");
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].id, "b");
    }
}
