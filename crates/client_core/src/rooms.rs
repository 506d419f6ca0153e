use std::sync::Arc;

use shared::{
    domain::{RequestId, StatementId},
    protocol::{LobbyRoom, RoomJoinRequest},
};
use tracing::debug;

use crate::{
    error::StoreError,
    reconcile::{merge, merge_all, remove_where},
    validate::{validate_all, Validate},
};

/// Join requests and the lobby rooms they resolve into.
///
/// A request is never marked accepted. Acceptance shows up as a [`LobbyRoom`]
/// for the requested `statement_id`, so the two collections are only
/// eventually consistent with each other.
#[derive(Debug, Clone, Default)]
pub struct RoomRequestStore {
    requests: Arc<Vec<RoomJoinRequest>>,
    lobby_rooms: Arc<Vec<LobbyRoom>>,
}

impl RoomRequestStore {
    pub fn requests(&self) -> &Arc<Vec<RoomJoinRequest>> {
        &self.requests
    }

    pub fn lobby_rooms(&self) -> &Arc<Vec<LobbyRoom>> {
        &self.lobby_rooms
    }

    /// Upserts `request` by `request_id`, or withdraws when `request` is `None`.
    ///
    /// Withdrawal drops every request under `parent_id`, whoever owns it, and
    /// is the only case where `parent_id` must be set.
    pub fn set_ask_to_join_rooms(
        &mut self,
        request: Option<RoomJoinRequest>,
        parent_id: &StatementId,
    ) -> Result<(), StoreError> {
        match request {
            None => {
                if parent_id.is_blank() {
                    return Err(StoreError::missing("parent_id"));
                }
                let before = self.requests.len();
                let remaining = remove_where(&self.requests, |room| &room.parent_id == parent_id);
                debug!(
                    parent_id = %parent_id,
                    withdrawn = before - remaining.len(),
                    "withdrew room requests"
                );
                if remaining.len() != before {
                    self.requests = Arc::new(remaining);
                }
            }
            Some(request) => {
                request.validate()?;
                debug!(request_id = %request.request_id, "upserting room request");
                self.requests = Arc::new(merge(&self.requests, request));
            }
        }
        Ok(())
    }

    /// Replaces the whole request list, used for the initial snapshot. A
    /// repeated `request_id` keeps the first position and the last value.
    pub fn set_room_requests(&mut self, requests: Vec<RoomJoinRequest>) -> Result<(), StoreError> {
        validate_all(&requests)?;
        self.requests = Arc::new(merge_all(requests));
        Ok(())
    }

    pub fn remove_from_ask_to_join_rooms(&mut self, request_id: &RequestId) {
        if !self.requests.iter().any(|room| &room.request_id == request_id) {
            return;
        }
        self.requests = Arc::new(remove_where(&self.requests, |room| {
            &room.request_id == request_id
        }));
    }

    pub fn set_lobby_room(&mut self, room: LobbyRoom) -> Result<(), StoreError> {
        room.validate()?;
        self.lobby_rooms = Arc::new(merge(&self.lobby_rooms, room));
        Ok(())
    }

    pub fn set_lobby_rooms(&mut self, rooms: Vec<LobbyRoom>) -> Result<(), StoreError> {
        validate_all(&rooms)?;
        self.lobby_rooms = Arc::new(merge_all(rooms));
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/rooms_tests.rs"]
mod tests;
