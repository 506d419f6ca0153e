//! Boundary checks for payloads coming off the real-time listener.
//!
//! Raw JSON is decoded once, here, into either a typed entity or a
//! [`ValidationError`]. Typed entities built elsewhere still pass through
//! [`Validate`] before a store accepts them.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::{
    domain::{RequestId, StatementId, SubscriptionId},
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest, StoreEvent},
};

use crate::error::{ValidationError, ValidationFailure};

const EVENT_ENTITY: &str = "store event";

pub trait Validate {
    const ENTITY: &'static str;
    /// Wire fields that must be present and non-null before decoding.
    const REQUIRED_FIELDS: &'static [&'static str];

    fn validate(&self) -> Result<(), ValidationError>;
}

fn non_blank(entity: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            entity,
            ValidationFailure::EmptyIdentifier(field),
        ));
    }
    Ok(())
}

impl Validate for RoomJoinRequest {
    const ENTITY: &'static str = "room join request";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["requestId", "parentId", "statementId", "participant"];

    fn validate(&self) -> Result<(), ValidationError> {
        non_blank(Self::ENTITY, "requestId", self.request_id.as_str())?;
        non_blank(Self::ENTITY, "parentId", self.parent_id.as_str())?;
        non_blank(Self::ENTITY, "statementId", self.statement_id.as_str())?;
        non_blank(Self::ENTITY, "participant.uid", self.participant.uid.as_str())
    }
}

impl Validate for LobbyRoom {
    const ENTITY: &'static str = "lobby room";
    const REQUIRED_FIELDS: &'static [&'static str] = &["statementId", "roomId"];

    fn validate(&self) -> Result<(), ValidationError> {
        non_blank(Self::ENTITY, "statementId", self.statement_id.as_str())?;
        non_blank(Self::ENTITY, "roomId", self.room_id.as_str())
    }
}

impl Validate for MembershipSubscription {
    const ENTITY: &'static str = "membership subscription";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["statementsSubscribeId", "userId", "statementId", "role"];

    fn validate(&self) -> Result<(), ValidationError> {
        non_blank(
            Self::ENTITY,
            "statementsSubscribeId",
            self.statements_subscribe_id.as_str(),
        )?;
        non_blank(Self::ENTITY, "userId", self.user_id.as_str())?;
        non_blank(Self::ENTITY, "statementId", self.statement_id.as_str())
    }
}

pub fn validate_all<T: Validate>(items: &[T]) -> Result<(), ValidationError> {
    items.iter().try_for_each(Validate::validate)
}

pub fn decode_entity<T>(raw: &Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let object = as_object(T::ENTITY, raw)?;
    for field in T::REQUIRED_FIELDS {
        required(T::ENTITY, object, *field)?;
    }
    let entity: T = serde_json::from_value(raw.clone()).map_err(|err| {
        ValidationError::new(T::ENTITY, ValidationFailure::Malformed(err.to_string()))
    })?;
    entity.validate()?;
    Ok(entity)
}

pub fn decode_list<T>(raw: &Value) -> Result<Vec<T>, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let items = raw
        .as_array()
        .ok_or_else(|| ValidationError::new(T::ENTITY, ValidationFailure::NotAnArray))?;
    items.iter().map(decode_entity::<T>).collect()
}

/// Decodes a `{"type": ..., "payload": {...}}` envelope into a [`StoreEvent`].
pub fn decode_event(raw: &Value) -> Result<StoreEvent, ValidationError> {
    let envelope = as_object(EVENT_ENTITY, raw)?;
    let kind = required(EVENT_ENTITY, envelope, "type")?
        .as_str()
        .ok_or_else(|| malformed("`type` must be a string"))?;
    let payload = as_object(EVENT_ENTITY, required(EVENT_ENTITY, envelope, "payload")?)?;

    let event = match kind {
        "ask_to_join_room" => {
            let parent_id = StatementId::new(required_str(payload, "parent_id")?);
            let request = match payload.get("request") {
                None | Some(Value::Null) => None,
                Some(raw_request) => Some(decode_entity::<RoomJoinRequest>(raw_request)?),
            };
            StoreEvent::AskToJoinRoom { request, parent_id }
        }
        "room_requests_snapshot" => StoreEvent::RoomRequestsSnapshot {
            requests: decode_list(required(EVENT_ENTITY, payload, "requests")?)?,
        },
        "room_request_removed" => StoreEvent::RoomRequestRemoved {
            request_id: RequestId::new(required_str(payload, "request_id")?),
        },
        "lobby_room_updated" => StoreEvent::LobbyRoomUpdated {
            room: decode_entity(required(EVENT_ENTITY, payload, "room")?)?,
        },
        "lobby_rooms_snapshot" => StoreEvent::LobbyRoomsSnapshot {
            rooms: decode_list(required(EVENT_ENTITY, payload, "rooms")?)?,
        },
        "membership_updated" => StoreEvent::MembershipUpdated {
            membership: decode_entity(required(EVENT_ENTITY, payload, "membership")?)?,
        },
        "membership_removed" => StoreEvent::MembershipRemoved {
            statements_subscribe_id: SubscriptionId::new(required_str(
                payload,
                "statements_subscribe_id",
            )?),
        },
        "memberships_snapshot" => StoreEvent::MembershipsSnapshot {
            memberships: decode_list(required(EVENT_ENTITY, payload, "memberships")?)?,
        },
        other => return Err(malformed(&format!("unknown event type `{other}`"))),
    };
    Ok(event)
}

fn as_object<'a>(
    entity: &'static str,
    raw: &'a Value,
) -> Result<&'a Map<String, Value>, ValidationError> {
    raw.as_object()
        .ok_or_else(|| ValidationError::new(entity, ValidationFailure::NotAnObject))
}

fn required<'a>(
    entity: &'static str,
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(
            entity,
            ValidationFailure::MissingField(field),
        )),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(
    payload: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    required(EVENT_ENTITY, payload, field)?
        .as_str()
        .ok_or_else(|| malformed(&format!("`{field}` must be a string")))
}

fn malformed(detail: &str) -> ValidationError {
    ValidationError::new(EVENT_ENTITY, ValidationFailure::Malformed(detail.to_string()))
}

#[cfg(test)]
#[path = "tests/validate_tests.rs"]
mod tests;
