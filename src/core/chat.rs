//! Purpose: Decode a chat object whose `users` array mixes agents and customers.
//! Exports: `Chat`.
//! Role: Main consumer of the participant partitioner; other chat members stay plain JSON.
//! Invariants: The users array is captured raw and partitioned in a single pass.
//! Invariants: A chat with no `users` member (or `null`) has no participants.
use std::sync::Arc;

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::partition::{Participants, PartitionPolicy};
use crate::core::user::{Agent, Customer, User};
use crate::json::parse;

#[derive(Deserialize)]
struct ChatWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    access: Value,
    #[serde(default)]
    thread: Option<Value>,
    #[serde(default)]
    threads: Option<Vec<Value>>,
    #[serde(default)]
    is_followed: Option<bool>,
    #[serde(default)]
    users: Option<Box<RawValue>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: String,
    pub properties: Map<String, Value>,
    pub access: Value,
    pub thread: Option<Value>,
    pub threads: Vec<Value>,
    pub is_followed: bool,
    participants: Participants,
}

impl Chat {
    pub fn decode(input: &[u8], policy: PartitionPolicy) -> Result<Self, Error> {
        let wire: ChatWire = parse::from_slice(input).map_err(|err| {
            Error::new(ErrorKind::MalformedCommon)
                .with_message(format!("chat decode failed: {err}"))
                .with_hint(parse::hint_for_error(&err, "chat"))
                .with_source(err)
        })?;
        let participants = match &wire.users {
            Some(raw) => Participants::decode(raw.get().as_bytes(), policy)
                .map_err(|err| err.with_hint("chat `users` must be an array of user objects"))?,
            None => Participants::default(),
        };
        tracing::debug!(
            chat = wire.id.as_deref().unwrap_or(""),
            agents = participants.agent_count(),
            customers = participants.customer_count(),
            skipped = participants.skipped().len(),
            "decoded chat participants"
        );
        Ok(Self {
            id: wire.id.unwrap_or_default(),
            properties: wire.properties.unwrap_or_default(),
            access: wire.access,
            thread: wire.thread,
            threads: wire.threads.unwrap_or_default(),
            is_followed: wire.is_followed.unwrap_or_default(),
            participants,
        })
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.participants.agent(id)
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.participants.customer(id)
    }

    /// Agents and customers combined, in the order the payload listed them.
    pub fn users(&self) -> Vec<&Arc<User>> {
        self.participants.users()
    }
}

#[cfg(test)]
mod tests {
    use super::Chat;
    use crate::core::error::ErrorKind;
    use crate::core::partition::PartitionPolicy;

    #[test]
    fn chat_partitions_users_and_keeps_plain_members() {
        let input = br#"{
            "id":"PJ0MRSHTDG",
            "is_followed":true,
            "properties":{"routing":{"idle":false}},
            "thread":{"id":"K600PKZON8","active":true},
            "users":[
                {"id":"c1","type":"customer","name":"Max","email_verified":false},
                {"id":"a1","type":"agent","name":"Ann","routing_status":"accepting_chats","visibility":"all"}
            ]
        }"#;
        let chat = Chat::decode(input, PartitionPolicy::Lenient).expect("chat");
        assert_eq!(chat.id, "PJ0MRSHTDG");
        assert!(chat.is_followed);
        assert_eq!(chat.thread.as_ref().unwrap()["id"], "K600PKZON8");
        assert_eq!(chat.agent("a1").unwrap().visibility, "all");
        assert_eq!(chat.customer("c1").unwrap().user().name, "Max");
        let names: Vec<&str> = chat.users().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Max", "Ann"]);
    }

    #[test]
    fn chat_without_users_has_no_participants() {
        let chat = Chat::decode(br#"{"id":"X","users":null}"#, PartitionPolicy::Strict).expect("chat");
        assert!(chat.participants().is_empty());
        assert!(chat.threads.is_empty());
    }

    #[test]
    fn malformed_user_in_chat_fails_whole_chat() {
        let err = Chat::decode(br#"{"id":"X","users":[{"type":"agent"}]}"#, PartitionPolicy::Lenient)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);
        assert_eq!(err.index(), Some(0));

        let err = Chat::decode(br#"{"id":"X","users":{}}"#, PartitionPolicy::Lenient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);

        let err = Chat::decode(br#""chat""#, PartitionPolicy::Lenient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedCommon);
    }
}
