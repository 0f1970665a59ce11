use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::PreferenceStore;
use crate::{
    error::{AppError, AppResult},
    models::{NewPreference, Preference, PreferenceKind, User, UserProfile},
};

/// Postgres error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Row shape of `user_preferences`; `type` is stored as text
#[derive(Debug, sqlx::FromRow)]
struct PreferenceRow {
    id: i64,
    user_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    item_id: String,
    item_name: String,
    item_image: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PreferenceRow> for Preference {
    type Error = AppError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<PreferenceKind>()
            .map_err(|e| AppError::Internal(format!("Corrupt preference row {}: {}", row.id, e)))?;

        Ok(Preference {
            id: row.id,
            user_id: row.user_id,
            kind,
            item_id: row.item_id,
            item_name: row.item_name,
            item_image: row.item_image,
            created_at: row.created_at,
        })
    }
}

/// Preference store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a foreign key violation on insert to an unknown-user error
fn insert_error(e: sqlx::Error, user_id: &str) -> AppError {
    let unknown_user = matches!(
        &e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
    );
    if unknown_user {
        AppError::InvalidInput(format!("Unknown user {}", user_id))
    } else {
        AppError::from(e)
    }
}

const INSERT_PREFERENCE: &str = r#"
    INSERT INTO user_preferences (user_id, type, item_id, item_name, item_image)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, user_id, type, item_id, item_name, item_image, created_at
"#;

#[async_trait::async_trait]
impl PreferenceStore for PgStore {
    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, onboarding_completed, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn upsert_user(&self, user_id: &str, profile: UserProfile) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, users.email),
                name = COALESCE(EXCLUDED.name, users.name),
                updated_at = NOW()
            RETURNING id, email, name, onboarding_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(profile.email)
        .bind(profile.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn complete_onboarding(&self, user_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET onboarding_completed = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, onboarding_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_preferences(
        &self,
        user_id: &str,
        kind: Option<PreferenceKind>,
    ) -> AppResult<Vec<Preference>> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT id, user_id, type, item_id, item_name, item_image, created_at
            FROM user_preferences
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR type = $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Preference::try_from).collect()
    }

    async fn add_preference(&self, preference: NewPreference) -> AppResult<Preference> {
        let row = sqlx::query_as::<_, PreferenceRow>(INSERT_PREFERENCE)
            .bind(&preference.user_id)
            .bind(preference.kind.as_str())
            .bind(&preference.item_id)
            .bind(&preference.item_name)
            .bind(&preference.item_image)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, &preference.user_id))?;

        tracing::debug!(
            user_id = %preference.user_id,
            kind = %preference.kind,
            item_id = %preference.item_id,
            "Preference added"
        );

        Preference::try_from(row)
    }

    async fn remove_preference(&self, user_id: &str, item_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_preferences
            WHERE user_id = $1 AND item_id = $2
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn clear_preferences(&self, user_id: &str, kind: PreferenceKind) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_preferences
            WHERE user_id = $1 AND type = $2
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn apply_selection(
        &self,
        user_id: &str,
        kind: PreferenceKind,
        removed: &[String],
        added: Vec<NewPreference>,
    ) -> AppResult<Vec<Preference>> {
        let mut tx = self.pool.begin().await?;

        if !removed.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM user_preferences
                WHERE user_id = $1 AND type = $2 AND item_id = ANY($3)
                "#,
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(removed)
            .execute(&mut *tx)
            .await?;
        }

        let mut stored = Vec::with_capacity(added.len());
        for preference in &added {
            let row = sqlx::query_as::<_, PreferenceRow>(INSERT_PREFERENCE)
                .bind(&preference.user_id)
                .bind(preference.kind.as_str())
                .bind(&preference.item_id)
                .bind(&preference.item_name)
                .bind(&preference.item_image)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| insert_error(e, &preference.user_id))?;
            stored.push(Preference::try_from(row)?);
        }

        tx.commit().await?;
        Ok(stored)
    }
}
