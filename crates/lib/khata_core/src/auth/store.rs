//! Storage seams for sessions and users.
//!
//! Postgres implementations live in `queries`, in-memory ones in `memory`.

use async_trait::async_trait;

use super::AuthError;
use crate::models::auth::{DeviceKey, NewUser, RefreshRecord, User, UserWithPassword};

/// How to locate a refresh record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFilter {
    /// By the signed refresh token string.
    Token(String),
    /// By the `(user_id, user_type, device_type)` tuple.
    Device(DeviceKey),
    /// By token AND owner; used for in-place rotation.
    TokenOwner {
        refresh_token: String,
        user_id: String,
    },
}

impl RefreshFilter {
    pub fn matches(&self, record: &RefreshRecord) -> bool {
        match self {
            RefreshFilter::Token(token) => record.refresh_token == *token,
            RefreshFilter::Device(key) => {
                record.user_id == key.user_id
                    && record.user_type == key.user_type
                    && record.device_type == key.device_type
            }
            RefreshFilter::TokenOwner {
                refresh_token,
                user_id,
            } => record.refresh_token == *refresh_token && record.user_id == *user_id,
        }
    }
}

/// Changes applied by `update_one`. `updated_at` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshPatch {
    pub refresh_token: Option<String>,
    /// Increment `token_version` by one.
    pub bump_version: bool,
}

/// Refresh record collection. At most one record per `DeviceKey`.
#[async_trait]
pub trait RefreshStore: Send + Sync {
    async fn find_one(&self, filter: &RefreshFilter) -> Result<Option<RefreshRecord>, AuthError>;

    /// Remove the record for `key`, returning it as it was at deletion time.
    async fn delete_one(&self, key: &DeviceKey) -> Result<Option<RefreshRecord>, AuthError>;

    /// Apply `patch` to the single matching record; `None` when nothing matched.
    async fn update_one(
        &self,
        filter: &RefreshFilter,
        patch: &RefreshPatch,
    ) -> Result<Option<RefreshRecord>, AuthError>;

    /// Insert a new record. A duplicate tuple or token yields `Conflict`.
    async fn insert(&self, record: &RefreshRecord) -> Result<(), AuthError>;

    /// Every record belonging to a user, across devices.
    async fn find_for_user(&self, user_id: &str) -> Result<Vec<RefreshRecord>, AuthError>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError>;

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError>;

    /// Create a user. Duplicate email yields `Conflict`.
    async fn create_user(&self, user: &NewUser) -> Result<User, AuthError>;

    /// Returns whether the user existed.
    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, AuthError>;

    /// Returns whether the user existed.
    async fn mark_email_verified(&self, user_id: &str) -> Result<bool, AuthError>;

    async fn count(&self) -> Result<i64, AuthError>;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::auth::UserType;

    fn record() -> RefreshRecord {
        let now = Utc::now();
        RefreshRecord {
            refresh_token: "r1".into(),
            user_id: "u1".into(),
            user_type: UserType::User,
            device_type: "web".into(),
            token_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn device_filter_matches_whole_tuple() {
        let rec = record();
        assert!(RefreshFilter::Device(rec.device_key()).matches(&rec));

        let mut other = rec.device_key();
        other.user_type = UserType::Admin;
        assert!(!RefreshFilter::Device(other).matches(&rec));
    }

    #[test]
    fn token_owner_filter_requires_both_fields() {
        let rec = record();
        let hit = RefreshFilter::TokenOwner {
            refresh_token: "r1".into(),
            user_id: "u1".into(),
        };
        let miss = RefreshFilter::TokenOwner {
            refresh_token: "r1".into(),
            user_id: "u2".into(),
        };
        assert!(hit.matches(&rec));
        assert!(!miss.matches(&rec));
    }
}
