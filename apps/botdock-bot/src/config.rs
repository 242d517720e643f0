use anyhow::{Context, Result};
use reqwest::Url;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub admin_ids: Vec<i64>,
    pub trial_days: i64,
    pub referral_bonus_hours: i64,
    pub referral_bonus_cap_hours: Option<i64>,
    pub support_contact: String,
    pub support_url: Url,
    pub railway: Option<RailwayConfig>,
}

#[derive(Debug, Clone)]
pub struct RailwayConfig {
    pub token: String,
    pub project_id: String,
    pub service_image: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:botdock.db".to_string());

        let admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default());

        let trial_days = env_i64("TRIAL_DAYS", 3);
        let referral_bonus_hours = env_i64("REFERRAL_BONUS_HOURS", 2);
        let referral_bonus_cap_hours = env::var("REFERRAL_BONUS_CAP_HOURS")
            .ok()
            .and_then(|v| v.parse().ok());

        let support_contact = env::var("SUPPORT_CONTACT")
            .unwrap_or_else(|_| "botdock_support".to_string())
            .trim_start_matches('@')
            .to_string();
        let support_url = format!("https://t.me/{}", support_contact)
            .parse()
            .context("SUPPORT_CONTACT does not form a valid t.me link")?;

        // Deployment is optional: without Railway credentials the bot still
        // serves trials and referrals, /deploy just reports it is disabled.
        let railway = match (env::var("RAILWAY_TOKEN"), env::var("RAILWAY_PROJECT_ID")) {
            (Ok(token), Ok(project_id)) => Some(RailwayConfig {
                token,
                project_id,
                service_image: env::var("RAILWAY_SERVICE_IMAGE")
                    .unwrap_or_else(|_| "botdock/userbot:latest".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bot_token,
            database_url,
            admin_ids,
            trial_days,
            referral_bonus_hours,
            referral_bonus_cap_hours,
            support_contact,
            support_url,
            railway,
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable ADMIN_IDS entry: {}", part);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids(""), Vec::<i64>::new());
        assert_eq!(parse_admin_ids("123"), vec![123]);
        assert_eq!(parse_admin_ids("123, 456 ,789"), vec![123, 456, 789]);
        assert_eq!(parse_admin_ids("123,abc,456"), vec![123, 456]);
    }
}
