//! User profile repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{OperatorLocationEntity, ProfileEntity};
use crate::metrics::QueryTimer;

/// Repository for user profile database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Creates a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the profile or replaces its editable fields.
    ///
    /// Returns `None` when the update would drop the operator role while the
    /// user still holds an active assignment. The row is left unchanged.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        display_name: &str,
        email: Option<&str>,
        is_operator: bool,
    ) -> Result<Option<ProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("upsert_profile");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            INSERT INTO user_profiles (user_id, display_name, email, is_operator)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                is_operator = EXCLUDED.is_operator,
                updated_at = NOW()
            WHERE EXCLUDED.is_operator OR user_profiles.active_assignment_id IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(email)
        .bind(is_operator)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds a profile by the auth subject.
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileEntity>, sqlx::Error> {
        sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT * FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Stores the user's last-known position.
    pub async fn update_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<ProfileEntity>, sqlx::Error> {
        sqlx::query_as::<_, ProfileEntity>(
            r#"
            UPDATE user_profiles
            SET
                last_latitude = $2,
                last_longitude = $3,
                location_updated_at = NOW(),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&self.pool)
        .await
    }

    /// Operators with a known position, excluding `exclude_user_id`.
    pub async fn find_located_operators(
        &self,
        exclude_user_id: Uuid,
    ) -> Result<Vec<OperatorLocationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_located_operators");
        let result = sqlx::query_as::<_, OperatorLocationEntity>(
            r#"
            SELECT user_id, last_latitude, last_longitude
            FROM user_profiles
            WHERE is_operator = TRUE
              AND last_latitude IS NOT NULL
              AND last_longitude IS NOT NULL
              AND user_id <> $1
            "#,
        )
        .bind(exclude_user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
