//! Purpose: Provide the internal JSON decode entrypoints and failure categorization.
//! Exports: `from_slice`, `map_from_slice`, `seq_from_slice`, `ParseFailureCategory`,
//! `categorize_error`, `hint_for_error`.
//! Role: Parser boundary that centralizes serde_json usage details.
//! Invariants: Whole-input decodes reject trailing non-whitespace bytes.
//! Notes: Error mapping to `ErrorKind` is done by callsites so domain context stays explicit.

use serde::Deserializer as _;
use serde::de::{DeserializeOwned, Visitor};
use serde_json::error::Category;

pub(crate) fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(input)
}

/// Drive `visitor` over a top-level JSON object.
pub(crate) fn map_from_slice<'de, V>(input: &'de [u8], visitor: V) -> Result<V::Value, serde_json::Error>
where
    V: Visitor<'de>,
{
    let mut de = serde_json::Deserializer::from_slice(input);
    let value = (&mut de).deserialize_map(visitor)?;
    de.end()?;
    Ok(value)
}

/// Drive `visitor` over a top-level JSON array.
pub(crate) fn seq_from_slice<'de, V>(input: &'de [u8], visitor: V) -> Result<V::Value, serde_json::Error>
where
    V: Visitor<'de>,
{
    let mut de = serde_json::Deserializer::from_slice(input);
    let value = (&mut de).deserialize_seq(visitor)?;
    de.end()?;
    Ok(value)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    Shape,
    Truncated,
    Io,
}

impl ParseFailureCategory {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Shape => "shape",
            ParseFailureCategory::Truncated => "truncated",
            ParseFailureCategory::Io => "io",
        }
    }
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match err.classify() {
        Category::Syntax => ParseFailureCategory::Syntax,
        Category::Data => ParseFailureCategory::Shape,
        Category::Eof => ParseFailureCategory::Truncated,
        Category::Io => ParseFailureCategory::Io,
    }
}

pub(crate) fn hint_for_error(err: &serde_json::Error, context: &str) -> String {
    let category = categorize_error(err);
    let advice = match category {
        ParseFailureCategory::Syntax => "input is not valid JSON",
        ParseFailureCategory::Shape => "a field has the wrong JSON type or a required field is missing",
        ParseFailureCategory::Truncated => "input ended early; check that the payload is complete",
        ParseFailureCategory::Io => "input could not be read",
    };
    format!(
        "parse category: {}; context: {context}; {advice} (line {}, column {})",
        category.label(),
        err.line(),
        err.column()
    )
}

#[cfg(test)]
mod tests {
    use super::{ParseFailureCategory, categorize_error, from_slice, hint_for_error};
    use serde_json::Value;

    #[test]
    fn category_mapping_covers_syntax_shape_and_eof() {
        let syntax = from_slice::<Value>(br#"{"a":}"#).unwrap_err();
        assert_eq!(categorize_error(&syntax), ParseFailureCategory::Syntax);

        let shape = from_slice::<Vec<u8>>(br#"{"a":1}"#).unwrap_err();
        assert_eq!(categorize_error(&shape), ParseFailureCategory::Shape);

        let eof = from_slice::<Value>(br#"{"a":[1,2"#).unwrap_err();
        assert_eq!(categorize_error(&eof), ParseFailureCategory::Truncated);
    }

    #[test]
    fn hint_contains_category_and_context() {
        let err = from_slice::<Value>(b"nope").unwrap_err();
        let hint = hint_for_error(&err, "user");
        assert!(hint.contains("parse category: syntax"));
        assert!(hint.contains("context: user"));
    }
}
