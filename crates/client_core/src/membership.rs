use std::sync::Arc;

use shared::{domain::SubscriptionId, protocol::MembershipSubscription};
use tracing::debug;

use crate::{
    error::StoreError,
    reconcile::{merge, remove_where},
    validate::{validate_all, Validate},
};

/// Subscription records fed by two independent streams (added/updated and
/// removed). There is no version on a record, so whichever event is applied
/// last decides whether an id is present.
#[derive(Debug, Clone, Default)]
pub struct MembershipStore {
    memberships: Arc<Vec<MembershipSubscription>>,
}

impl MembershipStore {
    pub fn memberships(&self) -> &Arc<Vec<MembershipSubscription>> {
        &self.memberships
    }

    /// Upserts by `statements_subscribe_id`. A record for the same user and
    /// statement under a different id is dropped, keeping one record per pair.
    pub fn set_membership(&mut self, membership: MembershipSubscription) -> Result<(), StoreError> {
        membership.validate()?;
        self.memberships = Arc::new(upsert(&self.memberships, membership));
        Ok(())
    }

    pub fn remove_membership(&mut self, statements_subscribe_id: &SubscriptionId) {
        if !self
            .memberships
            .iter()
            .any(|existing| &existing.statements_subscribe_id == statements_subscribe_id)
        {
            debug!(%statements_subscribe_id, "remove for unknown membership ignored");
            return;
        }
        self.memberships = Arc::new(remove_where(&self.memberships, |existing| {
            &existing.statements_subscribe_id == statements_subscribe_id
        }));
    }

    pub fn set_memberships(
        &mut self,
        memberships: Vec<MembershipSubscription>,
    ) -> Result<(), StoreError> {
        validate_all(&memberships)?;
        let merged = memberships
            .into_iter()
            .fold(Vec::new(), |merged, membership| upsert(&merged, membership));
        self.memberships = Arc::new(merged);
        Ok(())
    }
}

fn upsert(
    collection: &[MembershipSubscription],
    membership: MembershipSubscription,
) -> Vec<MembershipSubscription> {
    let superseded = remove_where(collection, |existing| {
        existing.user_id == membership.user_id
            && existing.statement_id == membership.statement_id
            && existing.statements_subscribe_id != membership.statements_subscribe_id
    });
    if superseded.len() != collection.len() {
        debug!(
            user_id = %membership.user_id,
            statement_id = %membership.statement_id,
            "dropping superseded membership record"
        );
    }
    merge(&superseded, membership)
}

#[cfg(test)]
#[path = "tests/membership_tests.rs"]
mod tests;
