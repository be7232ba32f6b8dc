//! Purpose: Decode mixed-variant arrays once and bucket each element by its promoted variant.
//! Exports: `PartitionPolicy`, `Skipped`, `Participants`, `Participant`, `EventBatch`,
//! `decode_events`.
//! Role: Collection layer over envelope + discriminator + promoters.
//! Invariants: Structural corruption fails the whole array under every policy.
//! Invariants: An identity lives in at most one mapping; later elements win on duplicates.
//! Invariants: The flattened view is derived on demand from stored source positions.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::discriminator::{Classify, EventKind, UserKind};
use crate::core::envelope::decode_array;
use crate::core::error::{Error, ErrorKind};
use crate::core::event::{EventCommon, EventVariant, promote_event};
use crate::core::user::{Agent, Customer, User, UserCommon, UserVariant, promote_user};

/// How per-element variant failures are handled inside a collection decode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PartitionPolicy {
    /// Drop unknown tags and failed promotions, recording each as `Skipped`.
    #[default]
    Lenient,
    /// Fail on the first unknown tag or failed promotion.
    Strict,
}

/// An element left out of a collection under `PartitionPolicy::Lenient`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Skipped {
    pub index: usize,
    pub id: String,
    pub tag: String,
    #[serde(serialize_with = "serialize_kind")]
    pub reason: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.label())
}

/// Apply `policy` to an element whose variant could not be produced.
fn reject(
    policy: PartitionPolicy,
    skipped: &mut Vec<Skipped>,
    index: usize,
    id: &str,
    tag: &str,
    err: Error,
) -> Result<(), Error> {
    match policy {
        PartitionPolicy::Strict => Err(err.with_index(index)),
        PartitionPolicy::Lenient => {
            if err.kind() == ErrorKind::UnrecognizedVariant {
                tracing::debug!(index, id, tag, "skipping element with unrecognized type");
            } else {
                tracing::warn!(
                    index,
                    id,
                    tag,
                    field = err.field().unwrap_or(""),
                    error = %err,
                    "skipping element whose variant fields failed to decode"
                );
            }
            skipped.push(Skipped {
                index,
                id: id.to_string(),
                tag: tag.to_string(),
                reason: err.kind(),
                field: err.field().map(str::to_string),
            });
            Ok(())
        }
    }
}

fn unrecognized(entity: &str, tag: &str) -> Error {
    Error::new(ErrorKind::UnrecognizedVariant)
        .with_message(format!("unrecognized {entity} type {tag:?}"))
        .with_field("type")
        .with_hint("Use the lenient partition policy to skip unknown types.")
}

#[derive(Clone, Debug, PartialEq)]
struct Slot<V> {
    position: usize,
    value: V,
}

/// Chat participants split into agents and customers, keyed by user id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Participants {
    agents: BTreeMap<String, Slot<Agent>>,
    customers: BTreeMap<String, Slot<Customer>>,
    skipped: Vec<Skipped>,
}

/// Borrowed view of one participant in source order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Participant<'a> {
    Agent(&'a Agent),
    Customer(&'a Customer),
}

impl<'a> Participant<'a> {
    pub fn kind(&self) -> UserKind {
        match *self {
            Participant::Agent(_) => UserKind::Agent,
            Participant::Customer(_) => UserKind::Customer,
        }
    }

    pub fn user(&self) -> &'a Arc<User> {
        match *self {
            Participant::Agent(agent) => agent.user(),
            Participant::Customer(customer) => customer.user(),
        }
    }
}

impl Participants {
    /// Decode a JSON array of users and partition it.
    pub fn decode(input: &[u8], policy: PartitionPolicy) -> Result<Self, Error> {
        let users = decode_array::<UserCommon>(input)?;
        Self::from_users(users.into_iter().map(Arc::new), policy)
    }

    /// Partition already-decoded envelopes, in iteration order.
    pub fn from_users<I>(users: I, policy: PartitionPolicy) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Arc<User>>,
    {
        let mut out = Participants::default();
        for (index, user) in users.into_iter().enumerate() {
            if user.classify() == UserKind::Unknown {
                reject(
                    policy,
                    &mut out.skipped,
                    index,
                    &user.id,
                    &user.tag,
                    unrecognized("user", &user.tag),
                )?;
                continue;
            }
            match promote_user(&user) {
                Ok(UserVariant::Agent(agent)) => out.insert_agent(index, agent),
                Ok(UserVariant::Customer(customer)) => out.insert_customer(index, customer),
                Ok(UserVariant::Unknown(_)) => {}
                Err(err) => reject(policy, &mut out.skipped, index, &user.id, &user.tag, err)?,
            }
        }
        Ok(out)
    }

    fn insert_agent(&mut self, position: usize, agent: Agent) {
        let id = agent.user().id.clone();
        self.customers.remove(&id);
        self.agents.insert(id, Slot { position, value: agent });
    }

    fn insert_customer(&mut self, position: usize, customer: Customer) {
        let id = customer.user().id.clone();
        self.agents.remove(&id);
        self.customers.insert(id, Slot { position, value: customer });
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id).map(|slot| &slot.value)
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.get(id).map(|slot| &slot.value)
    }

    /// Agents ordered by id.
    pub fn agents(&self) -> impl Iterator<Item = (&str, &Agent)> {
        self.agents
            .iter()
            .map(|(id, slot)| (id.as_str(), &slot.value))
    }

    /// Customers ordered by id.
    pub fn customers(&self) -> impl Iterator<Item = (&str, &Customer)> {
        self.customers
            .iter()
            .map(|(id, slot)| (id.as_str(), &slot.value))
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn len(&self) -> usize {
        self.agents.len() + self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Every participant in source-array order.
    pub fn members(&self) -> Vec<Participant<'_>> {
        let mut ordered: Vec<(usize, Participant<'_>)> = self
            .agents
            .values()
            .map(|slot| (slot.position, Participant::Agent(&slot.value)))
            .chain(
                self.customers
                    .values()
                    .map(|slot| (slot.position, Participant::Customer(&slot.value))),
            )
            .collect();
        ordered.sort_by_key(|(position, _)| *position);
        ordered.into_iter().map(|(_, member)| member).collect()
    }

    /// Flattened, order-preserving view of the participants' envelopes.
    pub fn users(&self) -> Vec<&Arc<User>> {
        self.members().into_iter().map(|member| member.user()).collect()
    }
}

/// An ordered list of promoted events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBatch {
    events: Vec<EventVariant>,
    skipped: Vec<Skipped>,
}

impl EventBatch {
    pub fn events(&self) -> &[EventVariant] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventVariant> {
        self.events
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Decode a JSON array of events, keeping source order and applying `policy` to failures.
pub fn decode_events(input: &[u8], policy: PartitionPolicy) -> Result<EventBatch, Error> {
    let envelopes = decode_array::<EventCommon>(input)?;
    let mut batch = EventBatch::default();
    for (index, event) in envelopes.into_iter().map(Arc::new).enumerate() {
        if event.classify() == EventKind::Unknown {
            reject(
                policy,
                &mut batch.skipped,
                index,
                &event.id,
                &event.tag,
                unrecognized("event", &event.tag),
            )?;
            continue;
        }
        match promote_event(&event) {
            Ok(variant) => batch.events.push(variant),
            Err(err) => reject(policy, &mut batch.skipped, index, &event.id, &event.tag, err)?,
        }
    }
    Ok(batch)
}
