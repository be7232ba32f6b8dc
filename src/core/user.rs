//! Purpose: User entity (agent or customer) decoded through an envelope and promoted on demand.
//! Exports: `User`, `UserCommon`, `Agent`, `Customer`, `Visit`, `CustomerStatistics`,
//! `UserVariant`, `promote_user`.
//! Role: Concrete polymorphic entity #1; also the element type of chat participant lists.
//! Invariants: Promoting for the wrong tag yields `Ok(None)`, never a decode attempt.
//! Invariants: Promotion is pure; every call produces a fresh, independently-owned value.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::MapAccess;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::discriminator::{Classify, UserKind};
use crate::core::envelope::{CommonFields, Envelope, Origin, next_or_default};
use crate::core::error::Error;
use crate::core::fragment::Rfc3339;

pub type User = Envelope<UserCommon>;

/// Fields every user carries regardless of variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserCommon {
    pub id: String,
    #[serde(rename = "type")]
    pub tag: String,
    pub name: String,
    pub avatar: String,
    pub email: String,
    pub present: bool,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub events_seen_up_to: Option<OffsetDateTime>,
}

#[doc(hidden)]
#[derive(Default)]
pub struct UserCommonBuilder {
    id: Option<String>,
    tag: Option<String>,
    rest: UserCommon,
}

impl CommonFields for UserCommon {
    type Builder = UserCommonBuilder;
    const ENTITY: &'static str = "user";

    fn read_field<'de, A>(b: &mut UserCommonBuilder, key: &str, map: &mut A) -> Result<bool, A::Error>
    where
        A: MapAccess<'de>,
    {
        match key {
            "id" => b.id = Some(map.next_value()?),
            "type" => b.tag = Some(map.next_value()?),
            "name" => b.rest.name = next_or_default(map)?,
            "avatar" => b.rest.avatar = next_or_default(map)?,
            "email" => b.rest.email = next_or_default(map)?,
            "present" => b.rest.present = next_or_default(map)?,
            "events_seen_up_to" => {
                b.rest.events_seen_up_to = map.next_value::<Option<Rfc3339>>()?.map(|ts| ts.0)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn build(b: UserCommonBuilder) -> Result<Self, &'static str> {
        Ok(UserCommon {
            id: b.id.ok_or("id")?,
            tag: b.tag.ok_or("type")?,
            ..b.rest
        })
    }
}

impl Classify for User {
    type Kind = UserKind;

    fn classify(&self) -> UserKind {
        UserKind::from_tag(&self.tag)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Agent {
    #[serde(flatten)]
    user: Origin<UserCommon>,
    pub routing_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub visibility: String,
}

impl Agent {
    /// `Ok(None)` when the user is not an agent.
    pub fn promote(user: &Arc<User>) -> Result<Option<Self>, Error> {
        if user.classify() != UserKind::Agent {
            return Ok(None);
        }
        Self::from_fragments(user).map(Some)
    }

    fn from_fragments(user: &Arc<User>) -> Result<Self, Error> {
        let fragments = user.fragments();
        Ok(Self {
            user: Origin::new(user),
            routing_status: fragments.required("routing_status")?,
            visibility: fragments.optional("visibility")?,
        })
    }

    pub fn user(&self) -> &Arc<User> {
        self.user.envelope()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerStatistics {
    pub visits_count: u64,
    pub threads_count: u64,
    pub chats_count: u64,
    pub page_views_count: u64,
    pub greetings_shown_count: u64,
    pub greetings_accepted_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geolocation {
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub timezone: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitedPage {
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub opened_at: Option<OffsetDateTime>,
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visit {
    pub ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub geolocation: Geolocation,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<OffsetDateTime>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<OffsetDateTime>,
    pub last_pages: Vec<VisitedPage>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Customer {
    #[serde(flatten)]
    user: Origin<UserCommon>,
    pub email_verified: bool,
    pub last_visit: Visit,
    pub statistics: CustomerStatistics,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_last_event_created_at: Option<OffsetDateTime>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_last_event_created_at: Option<OffsetDateTime>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    pub session_fields: Vec<BTreeMap<String, String>>,
    pub followed: bool,
    pub online: bool,
    pub state: String,
    pub group_ids: Vec<i64>,
}

impl Customer {
    /// `Ok(None)` when the user is not a customer.
    pub fn promote(user: &Arc<User>) -> Result<Option<Self>, Error> {
        if user.classify() != UserKind::Customer {
            return Ok(None);
        }
        Self::from_fragments(user).map(Some)
    }

    fn from_fragments(user: &Arc<User>) -> Result<Self, Error> {
        let fragments = user.fragments();
        Ok(Self {
            user: Origin::new(user),
            email_verified: fragments.required("email_verified")?,
            last_visit: fragments.optional("last_visit")?,
            statistics: fragments.optional("statistics")?,
            agent_last_event_created_at: fragments.timestamp("agent_last_event_created_at")?,
            customer_last_event_created_at: fragments
                .timestamp("customer_last_event_created_at")?,
            created_at: fragments.timestamp("created_at")?,
            session_fields: fragments.optional("session_fields")?,
            followed: fragments.optional("followed")?,
            online: fragments.optional("online")?,
            state: fragments.optional("state")?,
            group_ids: fragments.optional("group_ids")?,
        })
    }

    pub fn user(&self) -> &Arc<User> {
        self.user.envelope()
    }
}

/// Closed union over user variants, plus the envelope itself for unknown tags.
#[derive(Clone, Debug, PartialEq)]
pub enum UserVariant {
    Agent(Agent),
    Customer(Customer),
    Unknown(Arc<User>),
}

impl UserVariant {
    pub fn kind(&self) -> UserKind {
        match self {
            UserVariant::Agent(_) => UserKind::Agent,
            UserVariant::Customer(_) => UserKind::Customer,
            UserVariant::Unknown(_) => UserKind::Unknown,
        }
    }

    pub fn user(&self) -> &Arc<User> {
        match self {
            UserVariant::Agent(agent) => agent.user(),
            UserVariant::Customer(customer) => customer.user(),
            UserVariant::Unknown(user) => user,
        }
    }
}

/// Classify then promote. Unknown tags are a value; broken variant data is an error.
pub fn promote_user(user: &Arc<User>) -> Result<UserVariant, Error> {
    match user.classify() {
        UserKind::Agent => Agent::from_fragments(user).map(UserVariant::Agent),
        UserKind::Customer => Customer::from_fragments(user).map(UserVariant::Customer),
        UserKind::Unknown => Ok(UserVariant::Unknown(Arc::clone(user))),
    }
}
