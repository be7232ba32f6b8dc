//! Purpose: Contract tests for envelope decode, classification, promotion, and partitioning.
//! Exports: Integration tests only.
//! Role: Exercise the public `lcwire::api` surface the way downstream callers use it.
//! Invariants: Tests use inline wire payloads; no fixtures on disk.
use std::sync::Arc;

use lcwire::api::{
    Agent, Chat, Classify, Customer, ErrorKind, Event, EventKind, EventVariant, File, Message,
    Participants, PartitionPolicy, RichMessage, User, UserKind, UserVariant, decode_events,
    promote_event, promote_user,
};

fn event(input: &str) -> Arc<Event> {
    Arc::new(Event::decode_str(input).expect("event envelope"))
}

fn user(input: &str) -> Arc<User> {
    Arc::new(User::decode_str(input).expect("user envelope"))
}

#[test]
fn mixed_users_partition_into_keyed_mappings() {
    let input = br#"[
        {"type":"agent","id":"a1","routing_status":"accepting_chats"},
        {"type":"customer","id":"c1","email_verified":true},
        {"type":"unknown_future_type","id":"x1"}
    ]"#;
    let participants = Participants::decode(input, PartitionPolicy::default()).expect("partition");

    assert_eq!(participants.agent_count() + participants.customer_count(), 2);
    assert_eq!(
        participants.agent("a1").expect("agent").routing_status,
        "accepting_chats"
    );
    assert!(participants.customer("c1").expect("customer").email_verified);
    assert!(participants.agent("x1").is_none());
    assert!(participants.customer("x1").is_none());

    let flattened: Vec<&str> = participants.users().iter().map(|u| u.id.as_str()).collect();
    assert_eq!(flattened, vec!["a1", "c1"]);
}

#[test]
fn message_without_postback_promotes() {
    let envelope = event(r#"{"type":"message","author_id":"u1","text":"hi"}"#);
    let message = Message::promote(&envelope)
        .expect("promote")
        .expect("message variant");
    assert_eq!(message.text, "hi");
    assert!(message.postback.is_none());
    assert_eq!(message.event().author_id, "u1");
}

#[test]
fn promote_for_another_tag_returns_none() {
    let envelope = event(r#"{"type":"message","author_id":"u1","text":"hi"}"#);
    assert_eq!(envelope.classify(), EventKind::Message);
    assert!(File::promote(&envelope).expect("no error").is_none());
    assert!(RichMessage::promote(&envelope).expect("no error").is_none());

    let agent = user(r#"{"type":"agent","id":"a1","routing_status":"offline"}"#);
    assert!(Customer::promote(&agent).expect("no error").is_none());
    assert!(Agent::promote(&agent).expect("no error").is_some());
}

#[test]
fn omitted_optional_fields_take_defaults() {
    let envelope = event(
        r#"{"type":"file","author_id":"u1","content_type":"image/png","url":"https://cdn/x.png","name":"x.png"}"#,
    );
    let file = File::promote(&envelope).expect("promote").expect("file");
    assert_eq!(file.width, 0);
    assert_eq!(file.height, 0);
    assert_eq!(file.alternative_text, "");

    let customer = user(r#"{"type":"customer","id":"c1","email_verified":false}"#);
    let customer = Customer::promote(&customer).expect("promote").expect("customer");
    assert!(customer.group_ids.is_empty());
    assert_eq!(customer.statistics.chats_count, 0);
    assert!(customer.created_at.is_none());
}

#[test]
fn wrong_shape_required_field_fails_promotion_only() {
    let raw = r#"{"type":"message","author_id":"u1","text":5}"#;
    let envelope = event(raw);
    let err = Message::promote(&envelope).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedField);
    assert_eq!(err.field(), Some("text"));

    assert!(Event::decode_str(raw).is_ok());
}

#[test]
fn null_required_field_is_malformed_not_missing() {
    let envelope = user(r#"{"type":"agent","id":"a1","routing_status":null}"#);
    let err = promote_user(&envelope).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedField);

    let envelope = user(r#"{"type":"agent","id":"a1"}"#);
    let err = promote_user(&envelope).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
    assert_eq!(err.field(), Some("routing_status"));
}

#[test]
fn malformed_common_fields_reject_the_envelope() {
    let err = User::decode_str(r#"{"type":"agent","routing_status":"offline"}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedCommon);
    assert_eq!(err.field(), Some("id"));

    let err = Event::decode_str(r#"{"type":"message","author_id":7,"text":"x"}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedCommon);

    let err = User::decode(b"not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedCommon);
    assert!(err.hint().is_some());
}

#[test]
fn unknown_tags_are_values_not_errors() {
    let envelope = user(r#"{"type":"bot","id":"b1","model":"x"}"#);
    assert_eq!(envelope.classify(), UserKind::Unknown);
    let variant = promote_user(&envelope).expect("unknown is not an error");
    assert!(matches!(variant, UserVariant::Unknown(_)));
    assert_eq!(variant.user().fragments().get("model").expect("fragment").raw(), "\"x\"");

    let envelope = event(r#"{"type":"reaction","author_id":"u1"}"#);
    let variant = promote_event(&envelope).expect("unknown is not an error");
    assert_eq!(variant.kind(), EventKind::Unknown);
}

#[test]
fn promoted_agent_round_trips_through_json() {
    let envelope = user(
        r#"{"type":"agent","id":"a1","name":"Ann","present":true,
            "events_seen_up_to":"2026-01-02T03:04:05Z",
            "routing_status":"accepting_chats","visibility":"all"}"#,
    );
    let agent = Agent::promote(&envelope).expect("promote").expect("agent");

    let encoded = serde_json::to_string(&agent).expect("encode");
    let again = user(&encoded);
    let decoded = Agent::promote(&again).expect("promote").expect("agent");
    assert_eq!(decoded, agent);
}

#[test]
fn promoted_message_round_trips_through_json() {
    let envelope = event(
        r#"{"id":"E1","type":"message","author_id":"u1","created_at":"2026-03-04T05:06:07.5Z",
            "text":"pick one","postback":{"id":"p1","thread_id":"t1","event_id":"e1","type":"button","value":"yes"}}"#,
    );
    let message = Message::promote(&envelope).expect("promote").expect("message");
    assert_eq!(message.postback.as_ref().expect("postback").kind, "button");

    let encoded = serde_json::to_string(&message).expect("encode");
    let decoded = Message::promote(&event(&encoded))
        .expect("promote")
        .expect("message");
    assert_eq!(decoded, message);
}

#[test]
fn lenient_event_list_contains_bad_siblings() {
    let input = br#"[
        {"type":"message","author_id":"u1","text":"hi"},
        {"type":"file","author_id":"u1","url":"https://cdn/x"},
        {"type":"filled_form","author_id":"u2","fields":[{"label":"Name","type":"name","value":"Max"}]}
    ]"#;
    let batch = decode_events(input, PartitionPolicy::Lenient).expect("events");
    assert_eq!(batch.len(), 2);
    match &batch.events()[1] {
        EventVariant::FilledForm(form) => assert_eq!(form.fields[0].value, "Max"),
        other => panic!("unexpected variant: {:?}", other.kind()),
    }
    assert_eq!(batch.skipped()[0].index, 1);
    assert_eq!(batch.skipped()[0].reason, ErrorKind::MissingField);
}

#[test]
fn chat_exposes_partitioned_users() {
    let input = br#"{"id":"C1","users":[
        {"type":"customer","id":"c1","email_verified":true},
        {"type":"agent","id":"a1","routing_status":"offline"},
        {"type":"bot","id":"b1"}
    ]}"#;
    let chat = Chat::decode(input, PartitionPolicy::Lenient).expect("chat");
    assert_eq!(chat.participants().len(), 2);
    assert_eq!(chat.participants().skipped().len(), 1);

    let err = Chat::decode(input, PartitionPolicy::Strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnrecognizedVariant);
    assert_eq!(err.index(), Some(2));
}
