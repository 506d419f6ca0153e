//! Insert-or-replace by key over ordered collections.
//!
//! Every store mutation goes through [`merge_by`] or [`remove_where`]. Both
//! return a fresh `Vec` and leave the input untouched, so a store can swap its
//! `Arc` only when something actually changed.

use shared::{
    domain::{RequestId, RoomId, StatementId, SubscriptionId},
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest},
};

/// Entities with a primary key inside their collection.
pub trait Keyed {
    type Key: PartialEq;

    fn key(&self) -> Self::Key;
}

impl Keyed for RoomJoinRequest {
    type Key = RequestId;

    fn key(&self) -> RequestId {
        self.request_id.clone()
    }
}

impl Keyed for LobbyRoom {
    type Key = (StatementId, RoomId);

    fn key(&self) -> Self::Key {
        (self.statement_id.clone(), self.room_id.clone())
    }
}

impl Keyed for MembershipSubscription {
    type Key = SubscriptionId;

    fn key(&self) -> SubscriptionId {
        self.statements_subscribe_id.clone()
    }
}

/// Replaces the element whose key matches `item` at its current position, or
/// appends `item` when none does.
pub fn merge_by<T, K, F>(collection: &[T], item: T, key: F) -> Vec<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let item_key = key(&item);
    let mut merged = collection.to_vec();
    match merged.iter().position(|existing| key(existing) == item_key) {
        Some(index) => merged[index] = item,
        None => merged.push(item),
    }
    merged
}

pub fn merge<T>(collection: &[T], item: T) -> Vec<T>
where
    T: Keyed + Clone,
{
    merge_by(collection, item, T::key)
}

/// Builds a collection as if `items` were upserted one by one into an empty
/// one: a repeated key keeps its first position and takes the last value.
pub fn merge_all<T>(items: Vec<T>) -> Vec<T>
where
    T: Keyed,
{
    let mut merged: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let item_key = item.key();
        match merged.iter().position(|existing| existing.key() == item_key) {
            Some(index) => merged[index] = item,
            None => merged.push(item),
        }
    }
    merged
}

pub fn remove_where<T, F>(collection: &[T], predicate: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    collection
        .iter()
        .filter(|existing| !predicate(existing))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
