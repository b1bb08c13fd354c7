//! Reference user store.
//!
//! An in-memory stand-in for the relational user table: create, read,
//! update and delete by id, plus the `load_all` capability the cache-aside
//! path consumes. Writes do not touch the cache; callers that need
//! read-your-writes call `CacheAsideOrchestrator::invalidate` themselves.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use herdguard_core::{
    BackingStore, HerdguardResult, LoadError, RecordCollection, RecordError, UserProfile,
};

/// In-memory user table ordered by id.
#[derive(Debug)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<i64, UserProfile>>,
    next_id: RwLock<i64>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: RwLock::new(1),
        }
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, assigning the next free id. The passed id is ignored.
    pub fn create(&self, user: UserProfile) -> UserProfile {
        let mut next_id = self.next_id.write().unwrap_or_else(|err| err.into_inner());
        let created = UserProfile { id: *next_id, ..user };
        *next_id += 1;
        self.users
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .insert(created.id, created.clone());
        created
    }

    pub fn get(&self, id: i64) -> HerdguardResult<UserProfile> {
        self.users
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(&id)
            .cloned()
            .ok_or_else(|| RecordError::UserNotFound { id }.into())
    }

    /// Replace the name and email of an existing user.
    pub fn update(&self, user: UserProfile) -> HerdguardResult<UserProfile> {
        let mut users = self.users.write().unwrap_or_else(|err| err.into_inner());
        let existing = users
            .get_mut(&user.id)
            .ok_or(RecordError::UserNotFound { id: user.id })?;
        existing.first_name = user.first_name;
        existing.last_name = user.last_name;
        existing.email = user.email;
        Ok(existing.clone())
    }

    /// Delete by id. Deleting a missing user is not an error.
    pub fn delete(&self, id: i64) -> bool {
        self.users
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(|err| err.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BackingStore<UserProfile> for InMemoryUserStore {
    async fn load_all(&self) -> Result<RecordCollection<UserProfile>, LoadError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdguard_core::HerdguardError;

    #[test]
    fn test_create_assigns_ids() {
        let store = InMemoryUserStore::new();
        let a = store.create(UserProfile::new(0, "Ada", "Lovelace", "ada@example.com"));
        let b = store.create(UserProfile::new(0, "Alan", "Turing", "alan@example.com"));
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.get(2).unwrap().first_name, "Alan");
    }

    #[test]
    fn test_get_missing_user() {
        let store = InMemoryUserStore::new();
        let err = store.get(99).unwrap_err();
        assert_eq!(
            err,
            HerdguardError::Record(RecordError::UserNotFound { id: 99 })
        );
    }

    #[test]
    fn test_update_and_delete() {
        let store = InMemoryUserStore::new();
        let user = store.create(UserProfile::new(0, "Grace", "Hopper", "grace@example.com"));
        let updated = store
            .update(UserProfile::new(user.id, "Grace", "Hopper", "rear.admiral@example.com"))
            .unwrap();
        assert_eq!(updated.email, "rear.admiral@example.com");
        assert!(store.delete(user.id));
        assert!(!store.delete(user.id));
        assert!(store.update(updated).is_err());
    }

    #[tokio::test]
    async fn test_load_all_in_id_order() {
        let store = InMemoryUserStore::new();
        for name in ["c", "a", "b"] {
            store.create(UserProfile::new(0, name, name, format!("{name}@example.com")));
        }
        let users = store.load_all().await.unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let empty = InMemoryUserStore::new();
        assert!(empty.load_all().await.unwrap().is_empty());
    }
}
