use super::*;
use serde_json::json;
use shared::domain::{Participant, Role};
use std::sync::Mutex;

use crate::error::{ValidationError, ValidationFailure};

#[derive(Default)]
struct RecordingReporter {
    reports: Mutex<Vec<(&'static str, StoreError)>>,
}

impl RecordingReporter {
    fn operations(&self) -> Vec<&'static str> {
        self.reports
            .lock()
            .expect("reports lock")
            .iter()
            .map(|(operation, _)| *operation)
            .collect()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, operation: &'static str, err: &StoreError) {
        self.reports
            .lock()
            .expect("reports lock")
            .push((operation, err.clone()));
    }
}

fn store_with_reporter() -> (DeliberationStore, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    (DeliberationStore::new(reporter.clone()), reporter)
}

fn request(request_id: &str, parent_id: &str, statement_id: &str, uid: &str) -> RoomJoinRequest {
    RoomJoinRequest {
        request_id: RequestId::from(request_id),
        parent_id: StatementId::from(parent_id),
        statement_id: StatementId::from(statement_id),
        participant: Participant::new(uid),
        room_number: None,
        approved: None,
    }
}

fn membership(id: &str, user: &str, statement: &str, role: Role) -> MembershipSubscription {
    MembershipSubscription {
        statements_subscribe_id: SubscriptionId::from(id),
        user_id: UserId::from(user),
        statement_id: StatementId::from(statement),
        role,
        display_name: None,
        last_update: None,
    }
}

#[test]
fn non_array_snapshot_leaves_requests_unchanged_and_is_reported() {
    let (mut store, reporter) = store_with_reporter();
    store
        .set_room_requests(vec![request("a", "g1", "s1", "u1")])
        .expect("seed");
    let before = Arc::clone(store.rooms().requests());

    let err = store
        .set_room_requests_raw(&json!({ "requestId": "b" }))
        .expect_err("object instead of array");

    assert_eq!(
        err,
        StoreError::Validation(ValidationError::new(
            "room join request",
            ValidationFailure::NotAnArray
        ))
    );
    assert!(Arc::ptr_eq(&before, store.rooms().requests()));
    assert_eq!(reporter.operations(), vec!["set_room_requests"]);
}

#[test]
fn raw_snapshot_then_removal_scenario() {
    let (mut store, reporter) = store_with_reporter();

    store
        .set_room_requests_raw(&json!([{
            "requestId": "a",
            "parentId": "g1",
            "statementId": "s1",
            "participant": { "uid": "u1" }
        }]))
        .expect("snapshot");
    assert_eq!(store.rooms().requests().len(), 1);

    store.remove_from_ask_to_join_rooms(&RequestId::from("a"));

    assert!(store.rooms().requests().is_empty());
    assert!(reporter.operations().is_empty());
}

#[test]
fn withdrawal_scenario_keeps_other_parents() {
    let (mut store, _) = store_with_reporter();
    for (id, parent) in [("r1", "p1"), ("r2", "p1"), ("r3", "p2")] {
        store
            .apply(StoreEvent::AskToJoinRoom {
                request: Some(request(id, parent, "s", "u")),
                parent_id: StatementId::from(parent),
            })
            .expect("request");
    }

    store
        .apply(StoreEvent::AskToJoinRoom {
            request: None,
            parent_id: StatementId::from("p1"),
        })
        .expect("withdraw");

    assert_eq!(
        store.rooms().requests().as_slice(),
        &[request("r3", "p2", "s", "u")]
    );
}

#[test]
fn withdraw_active_request_needs_an_active_statement() {
    let (mut store, reporter) = store_with_reporter();
    store
        .set_room_requests(vec![request("r1", "p1", "s1", "u1")])
        .expect("seed");

    let err = store.withdraw_active_request().expect_err("no session");
    assert_eq!(err, StoreError::missing("active_statement"));
    assert_eq!(store.rooms().requests().len(), 1);
    assert_eq!(reporter.operations(), vec!["withdraw_active_request"]);

    store.set_session(SessionContext::new(
        Some(UserId::from("u1")),
        Some(StatementId::from("p1")),
    ));
    store.withdraw_active_request().expect("withdraw");
    assert!(store.rooms().requests().is_empty());
}

#[test]
fn current_request_uses_session_user() {
    let (mut store, _) = store_with_reporter();
    store
        .set_room_requests(vec![
            request("r1", "p1", "s1", "u1"),
            request("r2", "p1", "s2", "u2"),
        ])
        .expect("seed");
    let parent = StatementId::from("p1");

    assert!(store.current_request(&parent).is_none());

    store.set_session(SessionContext::new(Some(UserId::from("u2")), None));
    let current = store.current_request(&parent).expect("u2 request");
    assert_eq!(current.request_id, RequestId::from("r2"));
}

#[test]
fn session_requirements_reject_blank_ids() {
    let session = SessionContext::new(Some(UserId::from(" ")), Some(StatementId::from("")));

    assert_eq!(
        session.require_user().expect_err("blank user"),
        StoreError::missing("current_user")
    );
    assert_eq!(
        session.require_statement().expect_err("blank statement"),
        StoreError::missing("active_statement")
    );
}

#[test]
fn apply_raw_rejects_garbage_without_mutation() {
    let (mut store, reporter) = store_with_reporter();
    store
        .set_membership(membership("m1", "u1", "s1", Role::Member))
        .expect("seed");
    let before = Arc::clone(store.membership().memberships());

    store
        .apply_raw(&json!({ "type": "membership_updated", "payload": { "membership": 42 } }))
        .expect_err("number");
    store.apply_raw(&json!(null)).expect_err("null envelope");

    assert!(Arc::ptr_eq(&before, store.membership().memberships()));
    assert_eq!(reporter.operations(), vec!["apply_raw", "apply_raw"]);
}

#[test]
fn apply_raw_routes_membership_stream() {
    let (mut store, _) = store_with_reporter();
    let statement = StatementId::from("s1");

    store
        .apply_raw(&json!({
            "type": "memberships_snapshot",
            "payload": { "memberships": [
                { "statementsSubscribeId": "m1", "userId": "u1", "statementId": "s1", "role": "member" },
                { "statementsSubscribeId": "m2", "userId": "u2", "statementId": "s1", "role": "admin" }
            ] }
        }))
        .expect("snapshot");
    store
        .apply_raw(&json!({
            "type": "membership_updated",
            "payload": { "membership": {
                "statementsSubscribeId": "m2", "userId": "u2", "statementId": "s1", "role": "banned"
            } }
        }))
        .expect("ban");
    store
        .apply_raw(&json!({
            "type": "membership_removed",
            "payload": { "statements_subscribe_id": "m1" }
        }))
        .expect("remove");

    assert!(store.joined(&statement).is_empty());
    let banned: Vec<&str> = store
        .banned(&statement)
        .iter()
        .map(|member| member.user_id.as_str())
        .collect();
    assert_eq!(banned, vec!["u2"]);
    assert_eq!(store.partition(&statement).banned.len(), 1);
}

#[test]
fn raw_snapshots_with_repeated_keys_settle_like_upserts() {
    let (mut store, reporter) = store_with_reporter();
    let statement = StatementId::from("s1");

    store
        .set_room_requests_raw(&json!([
            { "requestId": "a", "parentId": "g1", "statementId": "s1", "participant": { "uid": "u1" } },
            { "requestId": "a", "parentId": "g1", "statementId": "s2", "participant": { "uid": "u1" } }
        ]))
        .expect("request snapshot");
    assert_eq!(store.rooms().requests().len(), 1);
    assert_eq!(store.rooms().requests()[0].statement_id, StatementId::from("s2"));

    store
        .apply_raw(&json!({
            "type": "memberships_snapshot",
            "payload": { "memberships": [
                { "statementsSubscribeId": "m1", "userId": "u1", "statementId": "s1", "role": "member" },
                { "statementsSubscribeId": "m2", "userId": "u1", "statementId": "s1", "role": "banned" }
            ] }
        }))
        .expect("membership snapshot");

    let split = store.partition(&statement);
    assert!(split.joined.is_empty());
    assert_eq!(split.banned.len(), 1);
    assert!(reporter.operations().is_empty());
}

#[test]
fn unrecognised_role_keeps_the_member_joined() {
    let (mut store, reporter) = store_with_reporter();

    store
        .apply_raw(&json!({
            "type": "membership_updated",
            "payload": { "membership": {
                "statementsSubscribeId": "m1", "userId": "u1", "statementId": "s1",
                "role": "statement-parent-admin"
            } }
        }))
        .expect("unknown role accepted");

    let statement = StatementId::from("s1");
    assert_eq!(store.joined(&statement).len(), 1);
    assert!(store.banned(&statement).is_empty());
    assert!(reporter.operations().is_empty());
}

#[test]
fn lobby_and_topic_views_join_by_statement() {
    let (mut store, _) = store_with_reporter();
    store
        .set_room_requests(vec![
            request("r1", "p1", "s1", "u1"),
            request("r2", "p1", "s1", "u2"),
        ])
        .expect("requests");
    store
        .set_lobby_rooms(vec![LobbyRoom {
            statement_id: StatementId::from("s1"),
            room_id: shared::domain::RoomId::from("1"),
            participants_count: 2,
            last_update: None,
        }])
        .expect("lobby");

    let topic = StatementId::from("s1");
    assert_eq!(store.topic_participants(&topic).len(), 2);
    assert_eq!(
        store.request_for_topic(&topic).map(|r| r.request_id.as_str()),
        Some("r1")
    );
    let room = store.lobby_room_of_statement(&topic).expect("accepted room");
    assert_eq!(room.participants_count, 2);
    assert_eq!(store.participants_of_parent(&StatementId::from("p1")).len(), 2);
    assert_eq!(store.room_assignments(&StatementId::from("p1")).len(), 1);
}

#[test]
fn clones_share_untouched_collections() {
    let (mut store, _) = store_with_reporter();
    store
        .set_room_requests(vec![request("r1", "p1", "s1", "u1")])
        .expect("seed");
    let snapshot = store.clone();

    store
        .set_membership(membership("m1", "u1", "s1", Role::Member))
        .expect("membership");

    assert!(Arc::ptr_eq(
        snapshot.rooms().requests(),
        store.rooms().requests()
    ));
    assert!(!Arc::ptr_eq(
        snapshot.membership().memberships(),
        store.membership().memberships()
    ));
}
