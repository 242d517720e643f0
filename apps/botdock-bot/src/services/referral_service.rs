use anyhow::{Context, Result};
use botdock_db::repositories::ReferralRepository;
use botdock_db::utils::now_second;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// Ledger row written and the referrer's expiry pushed forward.
    Granted { new_expiry: DateTime<Utc> },
    SelfReferral,
    Duplicate,
    UnknownReferrer,
    /// Row is recorded for the statistics, but the referrer already reached
    /// the configured bonus ceiling.
    BonusExhausted,
}

#[derive(Clone)]
pub struct ReferralService {
    pool: SqlitePool,
    referrals: ReferralRepository,
    bonus_hours: i64,
    bonus_cap_hours: Option<i64>,
}

impl ReferralService {
    pub fn new(
        pool: SqlitePool,
        referrals: ReferralRepository,
        bonus_hours: i64,
        bonus_cap_hours: Option<i64>,
    ) -> Self {
        Self {
            pool,
            referrals,
            bonus_hours,
            bonus_cap_hours,
        }
    }

    pub fn bonus_hours(&self) -> i64 {
        self.bonus_hours
    }

    /// Records `referred_id` as referred by `referrer_id` and applies the
    /// bonus. Ledger insert and expiry extension commit together; every
    /// refusal path leaves the referrer's expiry untouched.
    ///
    /// The unique (referrer_id, referred_id) index is what defuses the
    /// double-bonus race: a concurrent second insert loses the conflict and
    /// turns into `Duplicate`.
    pub async fn record_referral(
        &self,
        referrer_id: i64,
        referred_id: i64,
    ) -> Result<ReferralOutcome> {
        if referrer_id == referred_id {
            return Ok(ReferralOutcome::SelfReferral);
        }

        let now = now_second();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open referral transaction")?;

        let referrer_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?)")
                .bind(referrer_id)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to look up referrer")?;
        if !referrer_exists {
            return Ok(ReferralOutcome::UnknownReferrer);
        }

        let inserted = sqlx::query(
            "INSERT INTO referrals (referrer_id, referred_id) VALUES (?, ?)
             ON CONFLICT(referrer_id, referred_id) DO NOTHING",
        )
        .bind(referrer_id)
        .bind(referred_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert referral")?
        .rows_affected()
            == 1;
        if !inserted {
            return Ok(ReferralOutcome::Duplicate);
        }

        if let Some(cap) = self.bonus_cap_hours {
            let granted: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM referrals WHERE referrer_id = ? AND bonus_given = 1",
            )
            .bind(referrer_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count granted bonuses")?;

            if granted * self.bonus_hours >= cap {
                tx.commit()
                    .await
                    .context("Failed to commit capped referral")?;
                info!(
                    "Referral {} -> {} recorded without bonus, cap of {}h reached",
                    referrer_id, referred_id, cap
                );
                return Ok(ReferralOutcome::BonusExhausted);
            }
        }

        let new_expiry: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE users
             SET bot_expiry = datetime(COALESCE(bot_expiry, ?), '+' || ? || ' seconds')
             WHERE user_id = ?
             RETURNING bot_expiry",
        )
        .bind(now)
        .bind(self.bonus_hours * 3600)
        .bind(referrer_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to apply referral bonus")?;

        sqlx::query("UPDATE referrals SET bonus_given = 1 WHERE referrer_id = ? AND referred_id = ?")
            .bind(referrer_id)
            .bind(referred_id)
            .execute(&mut *tx)
            .await
            .context("Failed to flag bonus as given")?;

        tx.commit()
            .await
            .context("Failed to commit referral transaction")?;

        info!(
            "Referral bonus granted: {} referred {}, new expiry {}",
            referrer_id, referred_id, new_expiry
        );
        Ok(ReferralOutcome::Granted { new_expiry })
    }

    pub async fn count_referrals(&self, user_id: i64) -> Result<i64> {
        self.referrals.count_for(user_id).await
    }

    pub async fn granted_count(&self, user_id: i64) -> Result<i64> {
        self.referrals.granted_count_for(user_id).await
    }
}
