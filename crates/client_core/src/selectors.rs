//! Read-only views over store collections. Each one is a linear scan of its
//! base collection and borrows from it.

use shared::{
    domain::{StatementId, UserId},
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest},
};

pub fn participants_of_parent<'a>(
    requests: &'a [RoomJoinRequest],
    parent_id: &StatementId,
) -> Vec<&'a RoomJoinRequest> {
    requests
        .iter()
        .filter(|room| &room.parent_id == parent_id)
        .collect()
}

/// First request `user_id` made under `parent_id`. Uniqueness is left to the
/// store; nothing here checks for a second match.
pub fn current_request_of_user<'a>(
    requests: &'a [RoomJoinRequest],
    user_id: Option<&UserId>,
    parent_id: &StatementId,
) -> Option<&'a RoomJoinRequest> {
    let user_id = user_id?;
    requests
        .iter()
        .find(|room| &room.participant.uid == user_id && &room.parent_id == parent_id)
}

pub fn topic_participants<'a>(
    requests: &'a [RoomJoinRequest],
    statement_id: &StatementId,
) -> Vec<&'a RoomJoinRequest> {
    requests
        .iter()
        .filter(|room| &room.statement_id == statement_id)
        .collect()
}

pub fn request_for_topic<'a>(
    requests: &'a [RoomJoinRequest],
    statement_id: &StatementId,
) -> Option<&'a RoomJoinRequest> {
    requests
        .iter()
        .find(|room| &room.statement_id == statement_id)
}

pub fn lobby_room_of_statement<'a>(
    lobby_rooms: &'a [LobbyRoom],
    statement_id: &StatementId,
) -> Option<&'a LobbyRoom> {
    lobby_rooms
        .iter()
        .find(|room| &room.statement_id == statement_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAssignment<'a> {
    /// `None` collects requests the admin has not placed yet.
    pub room_number: Option<u32>,
    pub participants: Vec<&'a RoomJoinRequest>,
}

/// Groups the requests under `parent_id` by room number, ascending, with the
/// unassigned group last. Order inside a group follows the store.
pub fn room_assignments<'a>(
    requests: &'a [RoomJoinRequest],
    parent_id: &StatementId,
) -> Vec<RoomAssignment<'a>> {
    let mut assignments: Vec<RoomAssignment<'a>> = Vec::new();
    for request in participants_of_parent(requests, parent_id) {
        match assignments
            .iter_mut()
            .find(|assignment| assignment.room_number == request.room_number)
        {
            Some(assignment) => assignment.participants.push(request),
            None => assignments.push(RoomAssignment {
                room_number: request.room_number,
                participants: vec![request],
            }),
        }
    }
    assignments.sort_by_key(|assignment| match assignment.room_number {
        Some(number) => (0, number),
        None => (1, 0),
    });
    assignments
}

pub fn members_of_statement<'a>(
    memberships: &'a [MembershipSubscription],
    statement_id: &StatementId,
) -> Vec<&'a MembershipSubscription> {
    memberships
        .iter()
        .filter(|member| &member.statement_id == statement_id)
        .collect()
}

pub fn joined<'a>(
    memberships: &'a [MembershipSubscription],
    statement_id: &StatementId,
) -> Vec<&'a MembershipSubscription> {
    members_of_statement(memberships, statement_id)
        .into_iter()
        .filter(|member| !member.role.is_banned())
        .collect()
}

pub fn banned<'a>(
    memberships: &'a [MembershipSubscription],
    statement_id: &StatementId,
) -> Vec<&'a MembershipSubscription> {
    members_of_statement(memberships, statement_id)
        .into_iter()
        .filter(|member| member.role.is_banned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipPartition<'a> {
    pub joined: Vec<&'a MembershipSubscription>,
    pub banned: Vec<&'a MembershipSubscription>,
}

pub fn partition<'a>(
    memberships: &'a [MembershipSubscription],
    statement_id: &StatementId,
) -> MembershipPartition<'a> {
    let (banned, joined): (Vec<_>, Vec<_>) = members_of_statement(memberships, statement_id)
        .into_iter()
        .partition(|member| member.role.is_banned());
    MembershipPartition { joined, banned }
}

#[cfg(test)]
#[path = "tests/selectors_tests.rs"]
mod tests;
