use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Participant, RequestId, Role, RoomId, StatementId, SubscriptionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinRequest {
    pub request_id: RequestId,
    /// Discussion being split into rooms.
    pub parent_id: StatementId,
    /// Sub-room (topic) the participant asked for.
    pub statement_id: StatementId,
    pub participant: Participant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRoom {
    pub statement_id: StatementId,
    pub room_id: RoomId,
    #[serde(default)]
    pub participants_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipSubscription {
    pub statements_subscribe_id: SubscriptionId,
    pub user_id: UserId,
    pub statement_id: StatementId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Entity changes delivered by the real-time document store, already decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoreEvent {
    AskToJoinRoom {
        #[serde(default)]
        request: Option<RoomJoinRequest>,
        parent_id: StatementId,
    },
    RoomRequestsSnapshot {
        requests: Vec<RoomJoinRequest>,
    },
    RoomRequestRemoved {
        request_id: RequestId,
    },
    LobbyRoomUpdated {
        room: LobbyRoom,
    },
    LobbyRoomsSnapshot {
        rooms: Vec<LobbyRoom>,
    },
    MembershipUpdated {
        membership: MembershipSubscription,
    },
    MembershipRemoved {
        statements_subscribe_id: SubscriptionId,
    },
    MembershipsSnapshot {
        memberships: Vec<MembershipSubscription>,
    },
}

impl StoreEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::AskToJoinRoom { .. } => "ask_to_join_room",
            StoreEvent::RoomRequestsSnapshot { .. } => "room_requests_snapshot",
            StoreEvent::RoomRequestRemoved { .. } => "room_request_removed",
            StoreEvent::LobbyRoomUpdated { .. } => "lobby_room_updated",
            StoreEvent::LobbyRoomsSnapshot { .. } => "lobby_rooms_snapshot",
            StoreEvent::MembershipUpdated { .. } => "membership_updated",
            StoreEvent::MembershipRemoved { .. } => "membership_removed",
            StoreEvent::MembershipsSnapshot { .. } => "memberships_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ask_to_join_room_uses_tagged_envelope_and_camel_case_entities() {
        let raw = json!({
            "type": "ask_to_join_room",
            "payload": {
                "parent_id": "p1",
                "request": {
                    "requestId": "r1",
                    "parentId": "p1",
                    "statementId": "s1",
                    "participant": { "uid": "u1", "displayName": "Dana" }
                }
            }
        });

        let event: StoreEvent = serde_json::from_value(raw).expect("decode");
        let StoreEvent::AskToJoinRoom { request, parent_id } = event else {
            panic!("unexpected event variant");
        };
        let request = request.expect("request present");
        assert_eq!(parent_id, StatementId::from("p1"));
        assert_eq!(request.participant.display_name.as_deref(), Some("Dana"));
        assert_eq!(request.room_number, None);
    }

    #[test]
    fn withdrawal_envelope_may_omit_request() {
        let raw = json!({ "type": "ask_to_join_room", "payload": { "parent_id": "p1" } });
        let event: StoreEvent = serde_json::from_value(raw).expect("decode");
        assert_eq!(
            event,
            StoreEvent::AskToJoinRoom {
                request: None,
                parent_id: StatementId::from("p1"),
            }
        );
        assert_eq!(event.kind(), "ask_to_join_room");
    }

    #[test]
    fn unknown_role_decodes_as_other() {
        let raw = json!({
            "statementsSubscribeId": "m1",
            "userId": "u1",
            "statementId": "s1",
            "role": "statement-parent-admin"
        });
        let membership: MembershipSubscription = serde_json::from_value(raw).expect("decode");
        assert_eq!(membership.role, Role::Other);
        assert!(!membership.role.is_banned());
    }

    #[test]
    fn role_must_still_be_a_string() {
        let raw = json!({
            "statementsSubscribeId": "m1",
            "userId": "u1",
            "statementId": "s1",
            "role": 7
        });
        assert!(serde_json::from_value::<MembershipSubscription>(raw).is_err());
    }
}
