//! Context that rights consult besides the calendar itself.

use crate::model::user::{GroupId, User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Questions a right may ask about the acting user.
pub trait AccessChecker {
    /// Demo users may edit every non-subscription calendar.
    fn is_demo_user(&self, user: &User) -> bool;
    /// True when `user_id` belongs to at least one of `group_ids`.
    fn is_member_of_any_group(&self, user_id: UserId, group_ids: &BTreeSet<GroupId>) -> bool;
}

/// Snapshot of group memberships plus the configured demo login.
///
/// Built once per request/command; stale after membership writes until
/// rebuilt with [`UserGroupCache::load`].
#[derive(Debug, Clone, Default)]
pub struct UserGroupCache {
    memberships: BTreeMap<UserId, BTreeSet<GroupId>>,
    demo_username: Option<String>,
}

impl UserGroupCache {
    pub fn new(demo_username: Option<String>) -> Self {
        Self {
            memberships: BTreeMap::new(),
            demo_username: demo_username
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }

    /// Loads every membership from storage.
    pub fn load(repo: &impl UserRepository, demo_username: Option<String>) -> RepoResult<Self> {
        let mut cache = Self::new(demo_username);
        for (user_id, group_id) in repo.list_memberships()? {
            cache.add_membership(user_id, group_id);
        }
        debug!(
            "event=group_cache_load module=access status=ok users={}",
            cache.memberships.len()
        );
        Ok(cache)
    }

    pub fn add_membership(&mut self, user_id: UserId, group_id: GroupId) {
        self.memberships.entry(user_id).or_default().insert(group_id);
    }

    pub fn groups_of(&self, user_id: UserId) -> Option<&BTreeSet<GroupId>> {
        self.memberships.get(&user_id)
    }
}

impl AccessChecker for UserGroupCache {
    fn is_demo_user(&self, user: &User) -> bool {
        self.demo_username
            .as_deref()
            .is_some_and(|demo| demo == user.username)
    }

    fn is_member_of_any_group(&self, user_id: UserId, group_ids: &BTreeSet<GroupId>) -> bool {
        if group_ids.is_empty() {
            return false;
        }
        self.memberships
            .get(&user_id)
            .is_some_and(|groups| !groups.is_disjoint(group_ids))
    }
}
