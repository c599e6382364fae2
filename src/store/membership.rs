use crate::models::{MemberRef, OrgMember, UserMembership};
use crate::store::{AppStore, Effect, RequestStatus, ResourceSlice};
use std::collections::BTreeSet;

/// Both projections of the user/organization relation, plus the id set
/// used for "already a member?" checks.
#[derive(Debug, Clone, Default)]
pub struct MembershipState {
    pub memberships: ResourceSlice<UserMembership>,
    pub members: ResourceSlice<OrgMember>,
    members_ids: BTreeSet<String>,
}

impl MembershipState {
    pub fn members_ids(&self) -> &BTreeSet<String> {
        &self.members_ids
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members_ids.contains(user_id)
    }

    pub fn clear(&mut self) {
        self.memberships.clear();
        self.members.clear();
        self.members_ids.clear();
    }
}

impl AppStore {
    pub async fn find_all_memberships(&mut self) -> RequestStatus {
        let ticket = self.membership.memberships.begin();
        let result = self.backend.my_memberships().await.map(Effect::Replace);
        let result = self.watch(result);
        self.membership
            .memberships
            .settle(ticket, result, "Failed to fetch memberships")
    }

    pub async fn find_all_org_members(&mut self, org_id: &str) -> RequestStatus {
        let ticket = self.membership.members.begin();
        let result = self.backend.list_members(org_id).await.map(Effect::Replace);
        let result = self.watch(result);
        let status = self
            .membership
            .members
            .settle(ticket, result, "Failed to fetch members");
        if status.is_fulfilled() {
            self.membership.members_ids = self
                .membership
                .members
                .items()
                .iter()
                .map(|m| m.id.clone())
                .collect();
        }
        status
    }

    pub async fn add_member_to_organization(&mut self, member: &MemberRef) -> RequestStatus {
        let ticket = self.membership.members.begin();
        let result = self
            .backend
            .add_member(&member.org_id, &member.user_id)
            .await
            .map(|_| Effect::Nothing);
        let result = self.watch(result);
        let status = self
            .membership
            .members
            .settle(ticket, result, "Failed to add member");
        if status.is_fulfilled() {
            self.membership.members_ids.insert(member.user_id.clone());
        }
        status
    }

    pub async fn remove_from_organization(&mut self, member: &MemberRef) -> RequestStatus {
        let ticket = self.membership.members.begin();
        let result = self
            .backend
            .remove_member(&member.org_id, &member.user_id)
            .await
            .map(|_| Effect::Remove(member.user_id.clone()));
        let result = self.watch(result);
        let status = self
            .membership
            .members
            .settle(ticket, result, "Failed to remove member");
        if status.is_fulfilled() {
            self.membership.members_ids.remove(&member.user_id);
        }
        status
    }
}
