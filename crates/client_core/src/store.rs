use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{RequestId, StatementId, SubscriptionId, UserId},
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest, StoreEvent},
};
use tracing::debug;

use crate::{
    error::{ErrorReporter, StoreError, TracingReporter},
    membership::MembershipStore,
    rooms::RoomRequestStore,
    selectors::{self, MembershipPartition, RoomAssignment},
    validate::{decode_event, decode_list},
};

/// Ids supplied by the session layer: who is signed in and which discussion
/// is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub current_user: Option<UserId>,
    pub active_statement: Option<StatementId>,
}

impl SessionContext {
    pub fn new(current_user: Option<UserId>, active_statement: Option<StatementId>) -> Self {
        Self {
            current_user,
            active_statement,
        }
    }

    pub fn require_user(&self) -> Result<&UserId, StoreError> {
        self.current_user
            .as_ref()
            .filter(|user_id| !user_id.is_blank())
            .ok_or_else(|| StoreError::missing("current_user"))
    }

    pub fn require_statement(&self) -> Result<&StatementId, StoreError> {
        self.active_statement
            .as_ref()
            .filter(|statement_id| !statement_id.is_blank())
            .ok_or_else(|| StoreError::missing("active_statement"))
    }
}

/// State container for the whole reconciliation core.
///
/// Every mutation either applies completely or leaves the container as it
/// was; rejected mutations are handed to the [`ErrorReporter`] and returned.
/// Cloning is cheap since collections sit behind `Arc`.
#[derive(Clone)]
pub struct DeliberationStore {
    rooms: RoomRequestStore,
    membership: MembershipStore,
    session: SessionContext,
    reporter: Arc<dyn ErrorReporter>,
}

impl Default for DeliberationStore {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}

impl DeliberationStore {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            rooms: RoomRequestStore::default(),
            membership: MembershipStore::default(),
            session: SessionContext::default(),
            reporter,
        }
    }

    pub fn rooms(&self) -> &RoomRequestStore {
        &self.rooms
    }

    pub fn membership(&self) -> &MembershipStore {
        &self.membership
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    fn checked(
        &self,
        operation: &'static str,
        result: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if let Err(err) = &result {
            self.reporter.report(operation, err);
        }
        result
    }

    pub fn set_ask_to_join_rooms(
        &mut self,
        request: Option<RoomJoinRequest>,
        parent_id: &StatementId,
    ) -> Result<(), StoreError> {
        let result = self.rooms.set_ask_to_join_rooms(request, parent_id);
        self.checked("set_ask_to_join_rooms", result)
    }

    /// Withdraws under the active statement.
    pub fn withdraw_active_request(&mut self) -> Result<(), StoreError> {
        let parent_id = match self.session.require_statement() {
            Ok(statement_id) => statement_id.clone(),
            Err(err) => return self.checked("withdraw_active_request", Err(err)),
        };
        self.set_ask_to_join_rooms(None, &parent_id)
    }

    pub fn set_room_requests(&mut self, requests: Vec<RoomJoinRequest>) -> Result<(), StoreError> {
        let result = self.rooms.set_room_requests(requests);
        self.checked("set_room_requests", result)
    }

    /// Snapshot replace from an undecoded listener payload.
    pub fn set_room_requests_raw(&mut self, raw: &Value) -> Result<(), StoreError> {
        let result = decode_list::<RoomJoinRequest>(raw)
            .map_err(StoreError::from)
            .and_then(|requests| self.rooms.set_room_requests(requests));
        self.checked("set_room_requests", result)
    }

    pub fn remove_from_ask_to_join_rooms(&mut self, request_id: &RequestId) {
        self.rooms.remove_from_ask_to_join_rooms(request_id);
    }

    pub fn set_lobby_room(&mut self, room: LobbyRoom) -> Result<(), StoreError> {
        let result = self.rooms.set_lobby_room(room);
        self.checked("set_lobby_room", result)
    }

    pub fn set_lobby_rooms(&mut self, rooms: Vec<LobbyRoom>) -> Result<(), StoreError> {
        let result = self.rooms.set_lobby_rooms(rooms);
        self.checked("set_lobby_rooms", result)
    }

    pub fn set_membership(&mut self, membership: MembershipSubscription) -> Result<(), StoreError> {
        let result = self.membership.set_membership(membership);
        self.checked("set_membership", result)
    }

    pub fn remove_membership(&mut self, statements_subscribe_id: &SubscriptionId) {
        self.membership.remove_membership(statements_subscribe_id);
    }

    pub fn set_memberships(
        &mut self,
        memberships: Vec<MembershipSubscription>,
    ) -> Result<(), StoreError> {
        let result = self.membership.set_memberships(memberships);
        self.checked("set_memberships", result)
    }

    pub fn apply(&mut self, event: StoreEvent) -> Result<(), StoreError> {
        debug!(kind = event.kind(), "applying store event");
        match event {
            StoreEvent::AskToJoinRoom { request, parent_id } => {
                self.set_ask_to_join_rooms(request, &parent_id)
            }
            StoreEvent::RoomRequestsSnapshot { requests } => self.set_room_requests(requests),
            StoreEvent::RoomRequestRemoved { request_id } => {
                self.remove_from_ask_to_join_rooms(&request_id);
                Ok(())
            }
            StoreEvent::LobbyRoomUpdated { room } => self.set_lobby_room(room),
            StoreEvent::LobbyRoomsSnapshot { rooms } => self.set_lobby_rooms(rooms),
            StoreEvent::MembershipUpdated { membership } => self.set_membership(membership),
            StoreEvent::MembershipRemoved {
                statements_subscribe_id,
            } => {
                self.remove_membership(&statements_subscribe_id);
                Ok(())
            }
            StoreEvent::MembershipsSnapshot { memberships } => self.set_memberships(memberships),
        }
    }

    pub fn apply_raw(&mut self, raw: &Value) -> Result<(), StoreError> {
        match decode_event(raw) {
            Ok(event) => self.apply(event),
            Err(err) => self.checked("apply_raw", Err(err.into())),
        }
    }

    pub fn participants_of_parent(&self, parent_id: &StatementId) -> Vec<&RoomJoinRequest> {
        selectors::participants_of_parent(self.rooms.requests(), parent_id)
    }

    /// The signed-in user's request under `parent_id`, if any.
    pub fn current_request(&self, parent_id: &StatementId) -> Option<&RoomJoinRequest> {
        selectors::current_request_of_user(
            self.rooms.requests(),
            self.session.current_user.as_ref(),
            parent_id,
        )
    }

    pub fn topic_participants(&self, statement_id: &StatementId) -> Vec<&RoomJoinRequest> {
        selectors::topic_participants(self.rooms.requests(), statement_id)
    }

    pub fn request_for_topic(&self, statement_id: &StatementId) -> Option<&RoomJoinRequest> {
        selectors::request_for_topic(self.rooms.requests(), statement_id)
    }

    pub fn lobby_room_of_statement(&self, statement_id: &StatementId) -> Option<&LobbyRoom> {
        selectors::lobby_room_of_statement(self.rooms.lobby_rooms(), statement_id)
    }

    pub fn room_assignments(&self, parent_id: &StatementId) -> Vec<RoomAssignment<'_>> {
        selectors::room_assignments(self.rooms.requests(), parent_id)
    }

    pub fn joined(&self, statement_id: &StatementId) -> Vec<&MembershipSubscription> {
        selectors::joined(self.membership.memberships(), statement_id)
    }

    pub fn banned(&self, statement_id: &StatementId) -> Vec<&MembershipSubscription> {
        selectors::banned(self.membership.memberships(), statement_id)
    }

    pub fn partition(&self, statement_id: &StatementId) -> MembershipPartition<'_> {
        selectors::partition(self.membership.memberships(), statement_id)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
