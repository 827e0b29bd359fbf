//! In-memory session and user stores.
//!
//! Used by tests and local runs without Postgres. Keyed `DashMap`s give the
//! same single-record atomicity the database provides per row.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::AuthError;
use super::store::{RefreshFilter, RefreshPatch, RefreshStore, UserStore};
use crate::models::auth::{DeviceKey, NewUser, RefreshRecord, User, UserWithPassword};
use crate::uuid::uuidv7;

/// Refresh records keyed by device tuple.
#[derive(Default)]
pub struct MemoryRefreshStore {
    records: DashMap<DeviceKey, RefreshRecord>,
}

impl MemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn locate(&self, filter: &RefreshFilter) -> Option<DeviceKey> {
        match filter {
            RefreshFilter::Device(key) => Some(key.clone()),
            _ => self
                .records
                .iter()
                .find(|entry| filter.matches(entry.value()))
                .map(|entry| entry.key().clone()),
        }
    }
}

#[async_trait]
impl RefreshStore for MemoryRefreshStore {
    async fn find_one(&self, filter: &RefreshFilter) -> Result<Option<RefreshRecord>, AuthError> {
        let Some(key) = self.locate(filter) else {
            return Ok(None);
        };
        Ok(self
            .records
            .get(&key)
            .filter(|rec| filter.matches(rec.value()))
            .map(|rec| rec.value().clone()))
    }

    async fn delete_one(&self, key: &DeviceKey) -> Result<Option<RefreshRecord>, AuthError> {
        Ok(self.records.remove(key).map(|(_, rec)| rec))
    }

    async fn update_one(
        &self,
        filter: &RefreshFilter,
        patch: &RefreshPatch,
    ) -> Result<Option<RefreshRecord>, AuthError> {
        let Some(key) = self.locate(filter) else {
            return Ok(None);
        };
        let Some(mut rec) = self.records.get_mut(&key) else {
            return Ok(None);
        };
        // Re-check under the entry lock; a concurrent writer may have won.
        if !filter.matches(&rec) {
            return Ok(None);
        }
        if let Some(token) = &patch.refresh_token {
            rec.refresh_token = token.clone();
        }
        if patch.bump_version {
            rec.token_version += 1;
        }
        rec.updated_at = Utc::now();
        Ok(Some(rec.clone()))
    }

    async fn insert(&self, record: &RefreshRecord) -> Result<(), AuthError> {
        if self
            .records
            .iter()
            .any(|entry| entry.refresh_token == record.refresh_token)
        {
            return Err(AuthError::Conflict("refresh token already stored".into()));
        }
        match self.records.entry(record.device_key()) {
            Entry::Occupied(_) => Err(AuthError::Conflict(format!(
                "refresh record exists for user {} on {}",
                record.user_id, record.device_type
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find_for_user(&self, user_id: &str) -> Result<Vec<RefreshRecord>, AuthError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Users keyed by id, with a unique email index.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserWithPassword>,
    emails: DashMap<String, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed user, e.g. a test fixture. Replaces any user with
    /// the same id.
    pub fn put(&self, user: User, password_hash: Option<String>) {
        self.emails.insert(user.email.to_lowercase(), user.id.clone());
        self.users.insert(
            user.id.clone(),
            UserWithPassword {
                user,
                password_hash,
            },
        );
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let Some(id) = self.emails.get(&email.to_lowercase()).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(user_id).map(|u| u.user.clone()))
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, AuthError> {
        let id = uuidv7().to_string();
        match self.emails.entry(new.email.to_lowercase()) {
            Entry::Occupied(_) => {
                return Err(AuthError::Conflict("Email already registered".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }
        let user = User {
            id: id.clone(),
            email: new.email.clone(),
            name: new.name.clone(),
            user_type: new.user_type,
            dial_code: new.dial_code.clone(),
            current_company_id: None,
            email_verified: false,
        };
        self.users.insert(
            id,
            UserWithPassword {
                user: user.clone(),
                password_hash: Some(new.password_hash.clone()),
            },
        );
        Ok(user)
    }

    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, AuthError> {
        Ok(match self.users.get_mut(user_id) {
            Some(mut u) => {
                u.password_hash = Some(password_hash.to_string());
                true
            }
            None => false,
        })
    }

    async fn mark_email_verified(&self, user_id: &str) -> Result<bool, AuthError> {
        Ok(match self.users.get_mut(user_id) {
            Some(mut u) => {
                u.user.email_verified = true;
                true
            }
            None => false,
        })
    }

    async fn count(&self) -> Result<i64, AuthError> {
        Ok(self.users.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserType;

    fn record(token: &str, device: &str) -> RefreshRecord {
        let now = Utc::now();
        RefreshRecord {
            refresh_token: token.into(),
            user_id: "u1".into(),
            user_type: UserType::User,
            device_type: device.into(),
            token_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_rejects_second_record_for_tuple() {
        let store = MemoryRefreshStore::new();
        store.insert(&record("r1", "web")).await.unwrap();
        let err = store.insert(&record("r2", "web")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_token() {
        let store = MemoryRefreshStore::new();
        store.insert(&record("r1", "web")).await.unwrap();
        let err = store.insert(&record("r1", "android")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_by_token_owner_rotates_in_place() {
        let store = MemoryRefreshStore::new();
        store.insert(&record("r1", "web")).await.unwrap();

        let patch = RefreshPatch {
            refresh_token: Some("r2".into()),
            bump_version: false,
        };
        let filter = RefreshFilter::TokenOwner {
            refresh_token: "r1".into(),
            user_id: "u1".into(),
        };
        let updated = store.update_one(&filter, &patch).await.unwrap().unwrap();
        assert_eq!(updated.refresh_token, "r2");
        assert_eq!(updated.token_version, 1);

        // The old token no longer matches anything.
        assert!(store.update_one(&filter, &patch).await.unwrap().is_none());
        assert!(
            store
                .find_one(&RefreshFilter::Token("r1".into()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn bump_version_increments() {
        let store = MemoryRefreshStore::new();
        let rec = record("r1", "web");
        store.insert(&rec).await.unwrap();
        let patch = RefreshPatch {
            refresh_token: None,
            bump_version: true,
        };
        let updated = store
            .update_one(&RefreshFilter::Device(rec.device_key()), &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.token_version, 2);
    }

    #[tokio::test]
    async fn user_emails_are_unique_case_insensitively() {
        let store = MemoryUserStore::new();
        let new = NewUser {
            email: "a@example.com".into(),
            name: None,
            user_type: UserType::User,
            dial_code: "+91".into(),
            password_hash: "h".into(),
        };
        let user = store.create_user(&new).await.unwrap();
        let dup = NewUser {
            email: "A@Example.com".into(),
            ..new
        };
        assert!(matches!(
            store.create_user(&dup).await.unwrap_err(),
            AuthError::Conflict(_)
        ));
        let found = store.find_by_email("A@EXAMPLE.COM").await.unwrap().unwrap();
        assert_eq!(found.user.id, user.id);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
