//! Purpose: Define the stable public Rust API boundary for lcwire.
//! Exports: Envelope, variant, partition, and error types needed by callers and the CLI.
//! Role: Public, additive-only surface over the `core` modules.
//! Invariants: New wire tags and optional fields are added here without breaking names.
//! Invariants: Internal helpers (parse seam, builders) are not re-exported.

pub use crate::core::chat::Chat;
pub use crate::core::discriminator::{Classify, EventKind, UserKind};
pub use crate::core::envelope::{CommonFields, Envelope, decode_array};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::event::{
    Event, EventCommon, EventVariant, File, FilledForm, FormField, Message, Postback,
    RichMessage, RichMessageButton, RichMessageElement, RichMessageImage, SystemMessage,
    promote_event,
};
pub use crate::core::fragment::{Fragment, Fragments, Presence};
pub use crate::core::partition::{
    EventBatch, Participant, Participants, PartitionPolicy, Skipped, decode_events,
};
pub use crate::core::user::{
    Agent, Customer, CustomerStatistics, Geolocation, User, UserCommon, UserVariant, Visit,
    VisitedPage, promote_user,
};
