use anyhow::Result;
use botdock_db::models::user::User;
use botdock_db::repositories::UserRepository;
use botdock_db::utils::now_second;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStart {
    Started {
        trial_end: DateTime<Utc>,
    },
    AlreadyActive {
        trial_start: DateTime<Utc>,
        trial_end: DateTime<Utc>,
    },
    NotRegistered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTime {
    Left(Duration),
    Expired,
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    TrialPending,
    TrialActive,
    TrialExpired,
    Premium,
}

/// Expiry against the clock. An expiry exactly at `now` already counts as
/// expired.
pub fn remaining_time_at(user: &User, now: DateTime<Utc>) -> RemainingTime {
    match user.bot_expiry {
        None => RemainingTime::Unset,
        Some(expiry) if expiry <= now => RemainingTime::Expired,
        Some(expiry) => RemainingTime::Left(expiry - now),
    }
}

/// Plan/trial state, computed on read. Expiry of the trial is never pushed
/// anywhere, it only exists as this comparison.
pub fn account_state_at(user: &User, now: DateTime<Utc>) -> AccountState {
    if user.premium_status {
        AccountState::Premium
    } else if user.trial_start.is_none() {
        AccountState::TrialPending
    } else if user.trial_end.is_some_and(|end| now < end) {
        AccountState::TrialActive
    } else {
        AccountState::TrialExpired
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: UserRepository,
    trial_days: i64,
}

impl AccountService {
    pub fn new(users: UserRepository, trial_days: i64) -> Self {
        Self { users, trial_days }
    }

    pub fn trial_days(&self) -> i64 {
        self.trial_days
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        self.users.get(user_id).await
    }

    /// First-contact registration. Safe to call on every /start; only the
    /// display fields are refreshed for a known user.
    pub async fn get_or_create(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<(User, bool)> {
        self.users.upsert(user_id, username, first_name).await
    }

    /// Arms the trial window once. The conditional update in the store is the
    /// whole race story: two concurrent calls cannot both observe "not
    /// started".
    pub async fn start_trial(&self, user_id: i64) -> Result<TrialStart> {
        let now = now_second();
        let trial_end = now + Duration::days(self.trial_days);

        if self.users.begin_trial(user_id, now, trial_end).await? {
            return Ok(TrialStart::Started { trial_end });
        }

        match self.users.get(user_id).await? {
            Some(user) => match (user.trial_start, user.trial_end) {
                (Some(trial_start), Some(trial_end)) => Ok(TrialStart::AlreadyActive {
                    trial_start,
                    trial_end,
                }),
                _ => anyhow::bail!("user {} has a half-set trial window", user_id),
            },
            None => Ok(TrialStart::NotRegistered),
        }
    }

    pub async fn remaining_time(&self, user_id: i64) -> Result<RemainingTime> {
        match self.users.get(user_id).await? {
            Some(user) => Ok(remaining_time_at(&user, now_second())),
            None => Ok(RemainingTime::Unset),
        }
    }

    /// Pushes `bot_expiry` forward by `delta`, counting from now when no
    /// expiry is set. Never clamps. Returns None for an unknown user.
    pub async fn extend(&self, user_id: i64, delta: Duration) -> Result<Option<DateTime<Utc>>> {
        self.users
            .extend_expiry(user_id, delta.num_seconds(), now_second())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdock_db::db::create_schema;
    use sqlx::SqlitePool;

    async fn test_service() -> AccountService {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        AccountService::new(UserRepository::new(pool), 3)
    }

    fn user_with_expiry(expiry: Option<DateTime<Utc>>) -> User {
        User {
            user_id: 42,
            username: None,
            first_name: None,
            status: "active".to_string(),
            trial_end: None,
            plan: botdock_db::models::user::Plan::Trial,
            created_at: now_second(),
            trial_start: None,
            bot_expiry: expiry,
            bot_active: false,
            premium_status: false,
        }
    }

    #[test]
    fn test_remaining_time_boundaries() {
        let now = now_second();

        assert_eq!(
            remaining_time_at(&user_with_expiry(None), now),
            RemainingTime::Unset
        );
        assert_eq!(
            remaining_time_at(&user_with_expiry(Some(now - Duration::minutes(1))), now),
            RemainingTime::Expired
        );
        // An expiry exactly at the current instant is already over.
        assert_eq!(
            remaining_time_at(&user_with_expiry(Some(now)), now),
            RemainingTime::Expired
        );
        assert_eq!(
            remaining_time_at(&user_with_expiry(Some(now + Duration::hours(5))), now),
            RemainingTime::Left(Duration::hours(5))
        );
    }

    #[test]
    fn test_account_state_transitions() {
        let now = now_second();
        let mut user = user_with_expiry(None);
        assert_eq!(account_state_at(&user, now), AccountState::TrialPending);

        user.trial_start = Some(now);
        user.trial_end = Some(now + Duration::days(3));
        assert_eq!(account_state_at(&user, now), AccountState::TrialActive);

        assert_eq!(
            account_state_at(&user, now + Duration::days(3)),
            AccountState::TrialExpired
        );

        user.premium_status = true;
        assert_eq!(account_state_at(&user, now), AccountState::Premium);
    }

    #[tokio::test]
    async fn test_get_or_create_idempotent() {
        let service = test_service().await;

        let (user, created) = service
            .get_or_create(42, Some("alice"), Some("Alice"))
            .await
            .unwrap();
        assert!(created);
        assert!(user.trial_start.is_none());

        let (user, created) = service
            .get_or_create(42, Some("alice_new"), Some("Alice"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(user.username.as_deref(), Some("alice_new"));
    }

    #[tokio::test]
    async fn test_start_trial_second_call_reports_first_window() {
        let service = test_service().await;
        service.get_or_create(42, None, None).await.unwrap();

        let first = service.start_trial(42).await.unwrap();
        let first_end = match first {
            TrialStart::Started { trial_end } => trial_end,
            other => panic!("expected Started, got {:?}", other),
        };

        let second = service.start_trial(42).await.unwrap();
        match second {
            TrialStart::AlreadyActive {
                trial_start,
                trial_end,
            } => {
                assert_eq!(trial_end, first_end);
                assert_eq!(trial_end - trial_start, Duration::days(3));
            }
            other => panic!("expected AlreadyActive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_trial_unknown_user() {
        let service = test_service().await;
        assert_eq!(
            service.start_trial(7).await.unwrap(),
            TrialStart::NotRegistered
        );
    }

    #[tokio::test]
    async fn test_trial_arms_expiry() {
        let service = test_service().await;
        service.get_or_create(42, None, None).await.unwrap();
        service.start_trial(42).await.unwrap();

        let user = service.get(42).await.unwrap().unwrap();
        assert_eq!(user.bot_expiry, user.trial_end);
        match service.remaining_time(42).await.unwrap() {
            RemainingTime::Left(left) => assert!(left <= Duration::days(3)),
            other => panic!("expected time left, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extend_stacks() {
        let service = test_service().await;
        service.get_or_create(42, None, None).await.unwrap();

        let first = service
            .extend(42, Duration::hours(2))
            .await
            .unwrap()
            .unwrap();
        let second = service
            .extend(42, Duration::hours(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second - first, Duration::hours(2));

        assert!(service.extend(99, Duration::hours(2)).await.unwrap().is_none());
    }
}
