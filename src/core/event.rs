//! Purpose: Chat event entity decoded through an envelope and promoted per event type.
//! Exports: `Event`, `EventCommon`, `Message`, `Postback`, `File`, `FilledForm`, `FormField`,
//! `SystemMessage`, `RichMessage` and its element types, `EventVariant`, `promote_event`.
//! Role: Concrete polymorphic entity #2; five known variants share one fragment namespace.
//! Invariants: The same fragment name may carry different shapes per variant (`text`).
//! Invariants: Optional fragments default without failing promotion; required ones never do.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::MapAccess;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::core::discriminator::{Classify, EventKind};
use crate::core::envelope::{CommonFields, Envelope, Origin, next_or_default};
use crate::core::error::Error;
use crate::core::fragment::Rfc3339;

pub type Event = Envelope<EventCommon>;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventCommon {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_id: String,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    pub author_id: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recipients: String,
    #[serde(rename = "type")]
    pub tag: String,
}

#[doc(hidden)]
#[derive(Default)]
pub struct EventCommonBuilder {
    author_id: Option<String>,
    tag: Option<String>,
    rest: EventCommon,
}

impl CommonFields for EventCommon {
    type Builder = EventCommonBuilder;
    const ENTITY: &'static str = "event";

    fn read_field<'de, A>(b: &mut EventCommonBuilder, key: &str, map: &mut A) -> Result<bool, A::Error>
    where
        A: MapAccess<'de>,
    {
        match key {
            "id" => b.rest.id = next_or_default(map)?,
            "custom_id" => b.rest.custom_id = next_or_default(map)?,
            "created_at" => {
                b.rest.created_at = map.next_value::<Option<Rfc3339>>()?.map(|ts| ts.0)
            }
            "author_id" => b.author_id = Some(map.next_value()?),
            "properties" => b.rest.properties = next_or_default(map)?,
            "recipients" => b.rest.recipients = next_or_default(map)?,
            "type" => b.tag = Some(map.next_value()?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn build(b: EventCommonBuilder) -> Result<Self, &'static str> {
        Ok(EventCommon {
            author_id: b.author_id.ok_or("author_id")?,
            tag: b.tag.ok_or("type")?,
            ..b.rest
        })
    }
}

impl Classify for Event {
    type Kind = EventKind;

    fn classify(&self) -> EventKind {
        EventKind::from_tag(&self.tag)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Postback {
    pub id: String,
    pub thread_id: String,
    pub event_id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    #[serde(flatten)]
    event: Origin<EventCommon>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postback: Option<Postback>,
}

impl Message {
    pub fn promote(event: &Arc<Event>) -> Result<Option<Self>, Error> {
        if event.classify() != EventKind::Message {
            return Ok(None);
        }
        Self::from_fragments(event).map(Some)
    }

    fn from_fragments(event: &Arc<Event>) -> Result<Self, Error> {
        let fragments = event.fragments();
        Ok(Self {
            event: Origin::new(event),
            text: fragments.required("text")?,
            postback: fragments.nullable("postback")?,
        })
    }

    pub fn event(&self) -> &Arc<Event> {
        self.event.envelope()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct File {
    #[serde(flatten)]
    event: Origin<EventCommon>,
    pub content_type: String,
    pub url: String,
    pub width: u64,
    pub height: u64,
    pub name: String,
    pub alternative_text: String,
}

impl File {
    pub fn promote(event: &Arc<Event>) -> Result<Option<Self>, Error> {
        if event.classify() != EventKind::File {
            return Ok(None);
        }
        Self::from_fragments(event).map(Some)
    }

    fn from_fragments(event: &Arc<Event>) -> Result<Self, Error> {
        let fragments = event.fragments();
        Ok(Self {
            event: Origin::new(event),
            content_type: fragments.required("content_type")?,
            url: fragments.required("url")?,
            width: fragments.optional("width")?,
            height: fragments.optional("height")?,
            name: fragments.required("name")?,
            alternative_text: fragments.optional("alternative_text")?,
        })
    }

    pub fn event(&self) -> &Arc<Event> {
        self.event.envelope()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormField {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilledForm {
    #[serde(flatten)]
    event: Origin<EventCommon>,
    pub fields: Vec<FormField>,
}

impl FilledForm {
    pub fn promote(event: &Arc<Event>) -> Result<Option<Self>, Error> {
        if event.classify() != EventKind::FilledForm {
            return Ok(None);
        }
        Self::from_fragments(event).map(Some)
    }

    fn from_fragments(event: &Arc<Event>) -> Result<Self, Error> {
        Ok(Self {
            event: Origin::new(event),
            fields: event.fragments().required("fields")?,
        })
    }

    pub fn event(&self) -> &Arc<Event> {
        self.event.envelope()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemMessage {
    #[serde(flatten)]
    event: Origin<EventCommon>,
    #[serde(rename = "system_message_type")]
    pub system_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub text_vars: BTreeMap<String, String>,
}

impl SystemMessage {
    pub fn promote(event: &Arc<Event>) -> Result<Option<Self>, Error> {
        if event.classify() != EventKind::SystemMessage {
            return Ok(None);
        }
        Self::from_fragments(event).map(Some)
    }

    fn from_fragments(event: &Arc<Event>) -> Result<Self, Error> {
        let fragments = event.fragments();
        Ok(Self {
            event: Origin::new(event),
            system_type: fragments.required("system_message_type")?,
            text: fragments.optional("text")?,
            text_vars: fragments.optional("text_vars")?,
        })
    }

    pub fn event(&self) -> &Arc<Event> {
        self.event.envelope()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichMessageButton {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub user_ids: Vec<String>,
    pub value: String,
    pub postback_id: String,
    /// One of `compact`, `full`, `tall`.
    pub webview_height: String,
    /// One of `new`, `current`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichMessageImage {
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub width: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub height: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alternative_text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichMessageElement {
    pub buttons: Vec<RichMessageButton>,
    pub title: String,
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<RichMessageImage>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RichMessage {
    #[serde(flatten)]
    event: Origin<EventCommon>,
    pub template_id: String,
    pub elements: Vec<RichMessageElement>,
}

impl RichMessage {
    pub fn promote(event: &Arc<Event>) -> Result<Option<Self>, Error> {
        if event.classify() != EventKind::RichMessage {
            return Ok(None);
        }
        Self::from_fragments(event).map(Some)
    }

    fn from_fragments(event: &Arc<Event>) -> Result<Self, Error> {
        let fragments = event.fragments();
        Ok(Self {
            event: Origin::new(event),
            template_id: fragments.required("template_id")?,
            elements: fragments.required("elements")?,
        })
    }

    pub fn event(&self) -> &Arc<Event> {
        self.event.envelope()
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventVariant {
    Message(Message),
    File(File),
    FilledForm(FilledForm),
    SystemMessage(SystemMessage),
    RichMessage(RichMessage),
    Unknown(Arc<Event>),
}

impl EventVariant {
    pub fn kind(&self) -> EventKind {
        match self {
            EventVariant::Message(_) => EventKind::Message,
            EventVariant::File(_) => EventKind::File,
            EventVariant::FilledForm(_) => EventKind::FilledForm,
            EventVariant::SystemMessage(_) => EventKind::SystemMessage,
            EventVariant::RichMessage(_) => EventKind::RichMessage,
            EventVariant::Unknown(_) => EventKind::Unknown,
        }
    }

    pub fn event(&self) -> &Arc<Event> {
        match self {
            EventVariant::Message(v) => v.event(),
            EventVariant::File(v) => v.event(),
            EventVariant::FilledForm(v) => v.event(),
            EventVariant::SystemMessage(v) => v.event(),
            EventVariant::RichMessage(v) => v.event(),
            EventVariant::Unknown(event) => event,
        }
    }
}

/// Classify then promote. Unknown tags are a value; broken variant data is an error.
pub fn promote_event(event: &Arc<Event>) -> Result<EventVariant, Error> {
    match event.classify() {
        EventKind::Message => Message::from_fragments(event).map(EventVariant::Message),
        EventKind::File => File::from_fragments(event).map(EventVariant::File),
        EventKind::FilledForm => FilledForm::from_fragments(event).map(EventVariant::FilledForm),
        EventKind::SystemMessage => {
            SystemMessage::from_fragments(event).map(EventVariant::SystemMessage)
        }
        EventKind::RichMessage => RichMessage::from_fragments(event).map(EventVariant::RichMessage),
        EventKind::Unknown => Ok(EventVariant::Unknown(Arc::clone(event))),
    }
}
