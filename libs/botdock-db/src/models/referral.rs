use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One referral edge. The (referrer_id, referred_id) pair is unique,
/// so a referred user can only ever credit one referrer once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Referral {
    pub id: i64,
    pub referrer_id: i64,
    pub referred_id: i64,
    pub bonus_given: bool,
    pub created_at: DateTime<Utc>,
}
