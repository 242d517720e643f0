use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::user::{Plan, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by ID")
    }

    /// Registers the user on first contact. Repeated calls only refresh the
    /// display fields and report `created = false`.
    pub async fn upsert(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<(User, bool)> {
        let created = sqlx::query(
            "INSERT INTO users (user_id, username, first_name) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(username)
        .bind(first_name)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?
        .rows_affected()
            == 1;

        if !created {
            sqlx::query("UPDATE users SET username = ?, first_name = ? WHERE user_id = ?")
                .bind(username)
                .bind(first_name)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .context("Failed to refresh user display fields")?;
        }

        let user = self
            .get(user_id)
            .await?
            .context("User row missing right after upsert")?;
        Ok((user, created))
    }

    /// Arms the trial window, but only if it was never armed before.
    /// Returns false when `trial_start` is already set (or the user is
    /// unknown); the caller disambiguates by reading the row.
    pub async fn begin_trial(
        &self,
        user_id: i64,
        trial_start: DateTime<Utc>,
        trial_end: DateTime<Utc>,
    ) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET trial_start = ?, trial_end = ?, bot_expiry = ?
             WHERE user_id = ? AND trial_start IS NULL",
        )
        .bind(trial_start)
        .bind(trial_end)
        .bind(trial_end)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to start trial")?;
        Ok(res.rows_affected() == 1)
    }

    /// Pushes `bot_expiry` forward by `seconds`, counting from `fallback_now`
    /// when no expiry is set yet. Returns the new expiry, or None for an
    /// unknown user.
    pub async fn extend_expiry(
        &self,
        user_id: i64,
        seconds: i64,
        fallback_now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE users
             SET bot_expiry = datetime(COALESCE(bot_expiry, ?), '+' || ? || ' seconds')
             WHERE user_id = ?
             RETURNING bot_expiry",
        )
        .bind(fallback_now)
        .bind(seconds)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to extend bot expiry")
    }

    /// Applies a purchased plan in one statement: plan column, premium flag
    /// and the expiry extension move together. Returns the updated row.
    pub async fn grant_plan(
        &self,
        user_id: i64,
        plan: Plan,
        seconds: i64,
        fallback_now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET plan = ?, premium_status = 1,
                 bot_expiry = datetime(COALESCE(bot_expiry, ?), '+' || ? || ' seconds')
             WHERE user_id = ?
             RETURNING *",
        )
        .bind(plan)
        .bind(fallback_now)
        .bind(seconds)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to grant plan")
    }

    pub async fn set_bot_active(&self, user_id: i64, active: bool) -> Result<()> {
        sqlx::query("UPDATE users SET bot_active = ? WHERE user_id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to update bot_active flag")?;
        Ok(())
    }

    pub async fn count_all(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")
    }

    pub async fn count_active_trials(&self, now: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE trial_end > ?")
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count active trials")
    }

    pub async fn count_premium(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE premium_status = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count premium users")
    }
}
