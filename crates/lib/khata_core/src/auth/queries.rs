//! Postgres-backed session and user stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::AuthError;
use super::store::{RefreshFilter, RefreshPatch, RefreshStore, UserStore};
use crate::models::auth::{DeviceKey, NewUser, RefreshRecord, User, UserType, UserWithPassword};
use crate::uuid::uuidv7;

const REFRESH_COLUMNS: &str =
    "refresh_token, user_id, user_type, device_type, token_version, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, email, name, user_type, dial_code, current_company_id, email_verified, password_hash";

#[derive(FromRow)]
struct RefreshRow {
    refresh_token: String,
    user_id: String,
    user_type: String,
    device_type: String,
    token_version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RefreshRow> for RefreshRecord {
    fn from(row: RefreshRow) -> Self {
        RefreshRecord {
            refresh_token: row.refresh_token,
            user_id: row.user_id,
            user_type: UserType::parse(&row.user_type),
            device_type: row.device_type,
            token_version: row.token_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: Option<String>,
    user_type: String,
    dial_code: String,
    current_company_id: Option<String>,
    email_verified: bool,
    password_hash: Option<String>,
}

impl From<UserRow> for UserWithPassword {
    fn from(row: UserRow) -> Self {
        UserWithPassword {
            user: User {
                id: row.id,
                email: row.email,
                name: row.name,
                user_type: UserType::parse(&row.user_type),
                dial_code: row.dial_code,
                current_company_id: row.current_company_id,
                email_verified: row.email_verified,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Build the `WHERE` clause for a filter, with placeholders starting at `first`.
fn filter_clause(filter: &RefreshFilter, first: usize) -> (String, Vec<String>) {
    match filter {
        RefreshFilter::Token(token) => (format!("refresh_token = ${first}"), vec![token.clone()]),
        RefreshFilter::Device(key) => (
            format!(
                "user_id = ${} AND user_type = ${} AND device_type = ${}",
                first,
                first + 1,
                first + 2
            ),
            vec![
                key.user_id.clone(),
                key.user_type.as_str().to_string(),
                key.device_type.clone(),
            ],
        ),
        RefreshFilter::TokenOwner {
            refresh_token,
            user_id,
        } => (
            format!("refresh_token = ${} AND user_id = ${}", first, first + 1),
            vec![refresh_token.clone(), user_id.clone()],
        ),
    }
}

/// Refresh records in the `refresh_tokens` table.
#[derive(Clone)]
pub struct PgRefreshStore {
    pool: PgPool,
}

impl PgRefreshStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshStore for PgRefreshStore {
    async fn find_one(&self, filter: &RefreshFilter) -> Result<Option<RefreshRecord>, AuthError> {
        let (clause, args) = filter_clause(filter, 1);
        let sql = format!("SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE {clause}");
        let mut query = sqlx::query_as::<_, RefreshRow>(&sql);
        for arg in args {
            query = query.bind(arg);
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(RefreshRecord::from))
    }

    async fn delete_one(&self, key: &DeviceKey) -> Result<Option<RefreshRecord>, AuthError> {
        let sql = format!(
            "DELETE FROM refresh_tokens \
             WHERE user_id = $1 AND user_type = $2 AND device_type = $3 \
             RETURNING {REFRESH_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RefreshRow>(&sql)
            .bind(&key.user_id)
            .bind(key.user_type.as_str())
            .bind(&key.device_type)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RefreshRecord::from))
    }

    async fn update_one(
        &self,
        filter: &RefreshFilter,
        patch: &RefreshPatch,
    ) -> Result<Option<RefreshRecord>, AuthError> {
        let (clause, args) = filter_clause(filter, 3);
        let sql = format!(
            "UPDATE refresh_tokens \
             SET refresh_token = COALESCE($1, refresh_token), \
                 token_version = token_version + $2, \
                 updated_at = now() \
             WHERE {clause} \
             RETURNING {REFRESH_COLUMNS}"
        );
        let mut query = sqlx::query_as::<_, RefreshRow>(&sql)
            .bind(patch.refresh_token.clone())
            .bind(i32::from(patch.bump_version));
        for arg in args {
            query = query.bind(arg);
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(RefreshRecord::from))
    }

    async fn insert(&self, record: &RefreshRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens \
             (id, refresh_token, user_id, user_type, device_type, token_version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(uuidv7())
        .bind(&record.refresh_token)
        .bind(&record.user_id)
        .bind(record.user_type.as_str())
        .bind(&record.device_type)
        .bind(record.token_version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_for_user(&self, user_id: &str) -> Result<Vec<RefreshRecord>, AuthError> {
        let sql = format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE user_id = $1 ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, RefreshRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RefreshRecord::from).collect())
    }
}

/// Users in the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserWithPassword::from))
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, user_type, dial_code, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(uuidv7().to_string())
            .bind(&new.email)
            .bind(&new.name)
            .bind(new.user_type.as_str())
            .bind(&new.dial_code)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match AuthError::from(e) {
                AuthError::Conflict(_) => AuthError::Conflict("Email already registered".into()),
                other => other,
            })?;
        Ok(UserWithPassword::from(row).user)
    }

    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_email_verified(&self, user_id: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, AuthError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_clause_numbers_placeholders_from_offset() {
        let key = DeviceKey {
            user_id: "u1".into(),
            user_type: UserType::Admin,
            device_type: "ios".into(),
        };
        let (clause, args) = filter_clause(&RefreshFilter::Device(key), 3);
        assert_eq!(clause, "user_id = $3 AND user_type = $4 AND device_type = $5");
        assert_eq!(args, vec!["u1", "admin", "ios"]);
    }

    #[test]
    fn token_owner_clause_binds_token_then_user() {
        let filter = RefreshFilter::TokenOwner {
            refresh_token: "tok".into(),
            user_id: "u9".into(),
        };
        let (clause, args) = filter_clause(&filter, 1);
        assert_eq!(clause, "refresh_token = $1 AND user_id = $2");
        assert_eq!(args, vec!["tok", "u9"]);
    }

    fn record(token: &str, device_type: &str) -> RefreshRecord {
        let now = Utc::now();
        RefreshRecord {
            refresh_token: token.into(),
            user_id: "u1".into(),
            user_type: UserType::User,
            device_type: device_type.into(),
            token_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    // Runs against a throwaway database created from DATABASE_URL.
    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn refresh_store_round_trip_on_postgres(pool: PgPool) {
        let store = PgRefreshStore::new(pool);
        let web = record("tok-web", "web");
        store.insert(&web).await.unwrap();
        store.insert(&record("tok-ios", "ios")).await.unwrap();

        let dup = store.insert(&record("tok-other", "web")).await.unwrap_err();
        assert!(matches!(dup, AuthError::Conflict(_)));

        // Rotation keeps the version; COALESCE leaves the token alone on a bump.
        let rotated = store
            .update_one(
                &RefreshFilter::Token("tok-web".into()),
                &RefreshPatch {
                    refresh_token: Some("tok-web-2".into()),
                    bump_version: false,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rotated.refresh_token, "tok-web-2");
        assert_eq!(rotated.token_version, 1);
        assert_eq!(rotated.device_key(), web.device_key());

        let bumped = store
            .update_one(
                &RefreshFilter::Device(web.device_key()),
                &RefreshPatch {
                    refresh_token: None,
                    bump_version: true,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bumped.refresh_token, "tok-web-2");
        assert_eq!(bumped.token_version, 2);

        let stale = store
            .update_one(
                &RefreshFilter::TokenOwner {
                    refresh_token: "tok-web".into(),
                    user_id: "u1".into(),
                },
                &RefreshPatch {
                    refresh_token: Some("nope".into()),
                    bump_version: false,
                },
            )
            .await
            .unwrap();
        assert!(stale.is_none());

        let removed = store.delete_one(&web.device_key()).await.unwrap().unwrap();
        assert_eq!(removed.token_version, 2);
        assert_eq!(removed.user_type, UserType::User);
        assert!(store.delete_one(&web.device_key()).await.unwrap().is_none());

        let left = store.find_for_user("u1").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].device_type, "ios");
    }
}
