use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::referral::Referral;

#[derive(Clone)]
pub struct ReferralRepository {
    pool: SqlitePool,
}

impl ReferralRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_pair(&self, referrer_id: i64, referred_id: i64) -> Result<Option<Referral>> {
        sqlx::query_as::<_, Referral>(
            "SELECT * FROM referrals WHERE referrer_id = ? AND referred_id = ?",
        )
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch referral pair")
    }

    /// Every referral attributed to this user, whether or not the bonus
    /// actually landed.
    pub async fn count_for(&self, referrer_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE referrer_id = ?")
            .bind(referrer_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count referrals")
    }

    /// Only referrals that resulted in a granted bonus.
    pub async fn granted_count_for(&self, referrer_id: i64) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM referrals WHERE referrer_id = ? AND bonus_given = 1",
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count granted referrals")
    }

    pub async fn count_all(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM referrals")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count all referrals")
    }
}
