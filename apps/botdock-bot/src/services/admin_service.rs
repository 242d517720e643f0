use anyhow::Result;
use botdock_db::models::user::{Plan, User};
use botdock_db::repositories::{ReferralRepository, UserRepository};
use botdock_db::utils::now_second;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_trials: i64,
    pub premium_users: i64,
    pub total_referrals: i64,
}

/// Holds the allow-list and the aggregate queries behind /admin. Dispatch
/// never compares identities itself, it always goes through [`is_admin`].
#[derive(Clone)]
pub struct AdminService {
    users: UserRepository,
    referrals: ReferralRepository,
    admin_ids: Vec<i64>,
}

impl AdminService {
    pub fn new(users: UserRepository, referrals: ReferralRepository, admin_ids: Vec<i64>) -> Self {
        Self {
            users,
            referrals,
            admin_ids,
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub async fn stats(&self) -> Result<AdminStats> {
        Ok(AdminStats {
            total_users: self.users.count_all().await?,
            active_trials: self.users.count_active_trials(now_second()).await?,
            premium_users: self.users.count_premium().await?,
            total_referrals: self.referrals.count_all().await?,
        })
    }

    /// Manual plan activation after an off-band payment. Returns the updated
    /// user, or None when no such user exists.
    pub async fn grant_plan(&self, user_id: i64, plan: Plan) -> Result<Option<User>> {
        let user = self
            .users
            .grant_plan(user_id, plan, plan.hosting_days() * 86400, now_second())
            .await?;
        if let Some(user) = &user {
            info!("Granted {} to user {}, expiry {:?}", plan, user.user_id, user.bot_expiry);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdock_db::db::create_schema;
    use chrono::Duration;
    use sqlx::SqlitePool;

    async fn setup(admin_ids: Vec<i64>) -> (AdminService, UserRepository) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        let users = UserRepository::new(pool.clone());
        let service = AdminService::new(users.clone(), ReferralRepository::new(pool), admin_ids);
        (service, users)
    }

    #[tokio::test]
    async fn test_is_admin_allow_list() {
        let (service, _) = setup(vec![100, 200]).await;
        assert!(service.is_admin(100));
        assert!(service.is_admin(200));
        assert!(!service.is_admin(42));

        let (empty, _) = setup(Vec::new()).await;
        assert!(!empty.is_admin(100));
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let (service, users) = setup(vec![1]).await;
        users.upsert(1, None, None).await.unwrap();
        users.upsert(2, None, None).await.unwrap();

        let now = now_second();
        users
            .begin_trial(1, now, now + Duration::days(3))
            .await
            .unwrap();
        service.grant_plan(2, Plan::Basic).await.unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_trials, 1);
        assert_eq!(stats.premium_users, 1);
        assert_eq!(stats.total_referrals, 0);
    }

    #[tokio::test]
    async fn test_grant_plan_unknown_user() {
        let (service, _) = setup(vec![1]).await;
        assert!(service.grant_plan(999, Plan::Pro).await.unwrap().is_none());
    }
}
