//! Purpose: Map an envelope's `type` tag onto a closed set of known variants.
//! Exports: `Classify`, `UserKind`, `EventKind`.
//! Role: Pure selector consulted before any promotion is attempted.
//! Invariants: Classification is total; unknown tags yield `Unknown`, never an error.
//! Invariants: Tag vocabulary is append-only; new wire tags land in `Unknown` until added.

/// Read the discriminator of an entity without touching its fragments.
pub trait Classify {
    type Kind: Copy + Eq;

    fn classify(&self) -> Self::Kind;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum UserKind {
    Agent,
    Customer,
    Unknown,
}

impl UserKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "agent" => UserKind::Agent,
            "customer" => UserKind::Customer,
            _ => UserKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserKind::Agent => "agent",
            UserKind::Customer => "customer",
            UserKind::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Message,
    File,
    FilledForm,
    SystemMessage,
    RichMessage,
    Unknown,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "message" => EventKind::Message,
            "file" => EventKind::File,
            "filled_form" => EventKind::FilledForm,
            "system_message" => EventKind::SystemMessage,
            "rich_message" => EventKind::RichMessage,
            _ => EventKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::File => "file",
            EventKind::FilledForm => "filled_form",
            EventKind::SystemMessage => "system_message",
            EventKind::RichMessage => "rich_message",
            EventKind::Unknown => "unknown",
        }
    }
}
