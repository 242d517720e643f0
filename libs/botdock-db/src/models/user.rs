use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hosting plan. `Trial` is assigned on registration; the paid tiers are
/// granted manually by an admin after an off-band payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Plan {
    Trial,
    Basic,
    Pro,
    Ultimate,
}

impl Plan {
    pub fn label(self) -> &'static str {
        match self {
            Plan::Trial => "Trial",
            Plan::Basic => "Basic",
            Plan::Pro => "Pro",
            Plan::Ultimate => "Ultimate",
        }
    }

    /// Hosting days added when the plan is granted.
    pub fn hosting_days(self) -> i64 {
        match self {
            Plan::Trial => 3,
            Plan::Basic => 30,
            Plan::Pro => 60,
            Plan::Ultimate => 90,
        }
    }

    pub fn price_usd(self) -> i64 {
        match self {
            Plan::Trial => 0,
            Plan::Basic => 5,
            Plan::Pro => 10,
            Plan::Ultimate => 20,
        }
    }

    /// How many bots may run at the same time on this plan.
    pub fn bot_slots(self) -> i64 {
        match self {
            Plan::Trial | Plan::Basic => 1,
            Plan::Pro => 3,
            Plan::Ultimate => 10,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown plan '{0}', expected trial, basic, pro or ultimate")]
pub struct ParsePlanError(String);

impl FromStr for Plan {
    type Err = ParsePlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trial" => Ok(Plan::Trial),
            "basic" => Ok(Plan::Basic),
            "pro" => Ok(Plan::Pro),
            "ultimate" => Ok(Plan::Ultimate),
            other => Err(ParsePlanError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub status: String,
    pub trial_end: Option<DateTime<Utc>>,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
    pub trial_start: Option<DateTime<Utc>>,
    pub bot_expiry: Option<DateTime<Utc>>,
    pub bot_active: bool,
    pub premium_status: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        for plan in [Plan::Trial, Plan::Basic, Plan::Pro, Plan::Ultimate] {
            let parsed: Plan = plan.label().parse().unwrap();
            assert_eq!(parsed, plan);
        }
        assert!("platinum".parse::<Plan>().is_err());
    }

    #[test]
    fn test_plan_catalog() {
        assert_eq!(Plan::Basic.hosting_days(), 30);
        assert_eq!(Plan::Pro.bot_slots(), 3);
        assert_eq!(Plan::Ultimate.price_usd(), 20);
    }
}
