//! Purpose: Shared error model for envelope decoding, promotion, and partitioning.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: One error type for every fallible operation; kinds mirror the decode taxonomy.
//! Invariants: Structural kinds (`MalformedCommon`) are fatal to the enclosing decode.
//! Invariants: Variant kinds (`MissingField`, `MalformedField`) are scoped to one promotion.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Internal,
    Usage,
    Io,
    /// Always-present fields are absent or ill-typed, or the JSON itself is broken.
    MalformedCommon,
    /// A variant-required fragment is absent from the envelope.
    MissingField,
    /// A fragment is present but does not decode into the variant's type.
    MalformedField,
    /// The discriminator tag is outside the known vocabulary.
    UnrecognizedVariant,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Internal => "internal",
            ErrorKind::Usage => "usage",
            ErrorKind::Io => "io",
            ErrorKind::MalformedCommon => "malformed-common",
            ErrorKind::MissingField => "missing-field",
            ErrorKind::MalformedField => "malformed-field",
            ErrorKind::UnrecognizedVariant => "unrecognized-variant",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    field: Option<String>,
    index: Option<usize>,
    hint: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            field: None,
            index: None,
            hint: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Wire name of the field that failed, when one is known.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Position of the offending element inside an array payload.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        if let Some(index) = self.index {
            write!(f, " (index: {index})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Io => 3,
        ErrorKind::MalformedCommon => 4,
        ErrorKind::MissingField => 5,
        ErrorKind::MalformedField => 6,
        ErrorKind::UnrecognizedVariant => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Io, 3),
            (ErrorKind::MalformedCommon, 4),
            (ErrorKind::MissingField, 5),
            (ErrorKind::MalformedField, 6),
            (ErrorKind::UnrecognizedVariant, 7),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_field_and_index() {
        let err = Error::new(ErrorKind::MissingField)
            .with_message("required fragment is absent")
            .with_field("routing_status")
            .with_index(2);
        assert_eq!(
            err.to_string(),
            "MissingField: required fragment is absent (field: routing_status) (index: 2)"
        );
        assert_eq!(err.field(), Some("routing_status"));
        assert_eq!(err.index(), Some(2));
    }
}
