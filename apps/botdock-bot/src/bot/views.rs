use botdock_db::models::deployment::Deployment;
use botdock_db::models::user::{Plan, User};
use chrono::{DateTime, Utc};
use teloxide::utils::html::escape;

use crate::services::account_service::RemainingTime;
use crate::services::admin_service::AdminStats;

pub fn format_date(t: DateTime<Utc>) -> String {
    t.format("%d/%m/%Y").to_string()
}

pub fn format_date_time(t: DateTime<Utc>) -> String {
    t.format("%d/%m/%Y %H:%M").to_string()
}

pub fn format_expiry(expiry: Option<DateTime<Utc>>) -> String {
    match expiry {
        Some(t) => format_date_time(t),
        None => "N/A".to_string(),
    }
}

pub fn format_remaining(remaining: RemainingTime) -> String {
    match remaining {
        RemainingTime::Left(left) => format!(
            "{}d {}h {}m",
            left.num_days(),
            left.num_hours() % 24,
            left.num_minutes() % 60
        ),
        RemainingTime::Expired => "EXPIRED".to_string(),
        RemainingTime::Unset => "Not set".to_string(),
    }
}

pub fn welcome_text(first_name: &str, trial_days: i64, bonus_hours: i64) -> String {
    format!(
        "🤖 <b>Welcome to Bot Hosting Service!</b>\n\n\
        👋 Hello {}!\n\n\
        🚀 <b>Get Started:</b>\n\
        • {} Days FREE Trial\n\
        • Premium Bot Features\n\
        • Easy Hosting on Railway\n\
        • 24/7 Support\n\n\
        🎁 <b>Referral Bonus:</b> Get {} hours FREE for each friend you refer!\n\n\
        👉 Select an option below:",
        escape(first_name),
        trial_days,
        bonus_hours
    )
}

pub fn trial_started_text(trial_days: i64, trial_end: DateTime<Utc>) -> String {
    format!(
        "🎉 <b>Trial Started Successfully!</b>\n\n\
        ✅ {} Days FREE Trial Activated\n\
        ⏰ Expires: {}\n\n\
        🚀 <b>Next Steps:</b>\n\
        1. Go to /dashboard\n\
        2. Deploy your bot with /deploy\n\
        3. Start using premium features\n\n\
        💡 <b>Tip:</b> Refer friends to get FREE hours!",
        trial_days,
        format_date_time(trial_end)
    )
}

pub fn trial_already_active_text(trial_start: DateTime<Utc>, trial_end: DateTime<Utc>) -> String {
    format!(
        "🎉 <b>Your trial is already active!</b>\n\n\
        Started: {}\n\
        Expires: {}\n\n\
        Check /dashboard for details.",
        format_date(trial_start),
        format_date(trial_end)
    )
}

pub fn dashboard_text(
    user: &User,
    remaining: RemainingTime,
    ref_count: i64,
    granted_count: i64,
    bonus_hours: i64,
    active_deployments: i64,
) -> String {
    let bot_status = if user.bot_active {
        "🟢 Active"
    } else {
        "🔴 Inactive"
    };
    let pending = (ref_count - granted_count).max(0);

    format!(
        "📊 <b>YOUR DASHBOARD</b>\n\n\
        👤 <b>Account Info:</b>\n\
        • User ID: <code>{}</code>\n\
        • Username: @{}\n\
        • Plan: {}\n\n\
        ⏰ <b>Bot Status:</b>\n\
        • Status: {}\n\
        • Active Deployments: {}\n\
        • Time Remaining: {}\n\
        • Expiry: {}\n\n\
        📈 <b>Statistics:</b>\n\
        • Total Referrals: {}\n\
        • Bonus Hours: {} hours\n\
        • Pending Bonus: {} hours",
        user.user_id,
        user.username.as_deref().unwrap_or("N/A"),
        user.plan.label().to_uppercase(),
        bot_status,
        active_deployments,
        format_remaining(remaining),
        format_expiry(user.bot_expiry),
        ref_count,
        granted_count * bonus_hours,
        pending * bonus_hours
    )
}

pub fn referral_text(
    link: &str,
    ref_count: i64,
    granted_count: i64,
    bonus_hours: i64,
    bonus_cap_hours: Option<i64>,
) -> String {
    let pending = (ref_count - granted_count).max(0);
    let limit_line = match bonus_cap_hours {
        Some(cap) => format!("4. Bonus is capped at {} hours", cap),
        None => "4. No limit on referrals!".to_string(),
    };

    format!(
        "📢 <b>REFERRAL SYSTEM</b>\n\n\
        🔗 <b>Your Referral Link:</b>\n\
        <code>{}</code>\n\n\
        📊 <b>Your Statistics:</b>\n\
        • Total Referrals: {}\n\
        • Bonus Hours Earned: {} hours\n\
        • Pending Bonus: {} hours\n\n\
        🎁 <b>How it works:</b>\n\
        1. Share your unique link above\n\
        2. Friend joins using your link\n\
        3. You get <b>{} hours FREE instantly</b>\n\
        {}\n\n\
        💰 <b>Bonus Applied Automatically</b>\n\
        The {} hours bonus is added to your bot runtime immediately.",
        link,
        ref_count,
        granted_count * bonus_hours,
        pending * bonus_hours,
        bonus_hours,
        limit_line,
        bonus_hours
    )
}

pub fn referral_joined_text(bonus_hours: i64) -> String {
    format!(
        "🎉 You joined via referral link!\n\
        The referrer received {} hours bonus.",
        bonus_hours
    )
}

pub fn referrer_bonus_text(bonus_hours: i64) -> String {
    format!(
        "🎉 Someone joined with your referral link!\n\
        +{} hours added to your hosting time.",
        bonus_hours
    )
}

pub fn premium_text(support_contact: &str) -> String {
    format!(
        "💰 <b>PREMIUM PLANS</b>\n\n\
        🚀 <b>BASIC PLAN</b> - ${}/month\n\
        • {} Days Bot Hosting\n\
        • Basic Features\n\
        • Email Support\n\
        • {} Bot Deployment\n\n\
        🔥 <b>PRO PLAN</b> - ${}/month\n\
        • {} Days Bot Hosting\n\
        • All Premium Features\n\
        • Priority Support\n\
        • {} Bot Deployments\n\n\
        💎 <b>ULTIMATE PLAN</b> - ${}/month\n\
        • {} Days Bot Hosting\n\
        • All Features Unlimited\n\
        • 24/7 Priority Support\n\
        • {} Bot Deployments\n\n\
        👉 <b>How to Purchase:</b>\n\
        1. Select a plan below\n\
        2. Contact admin for payment\n\
        3. Activate instantly after payment\n\n\
        📞 <b>Contact Admin:</b> @{}",
        Plan::Basic.price_usd(),
        Plan::Basic.hosting_days(),
        Plan::Basic.bot_slots(),
        Plan::Pro.price_usd(),
        Plan::Pro.hosting_days(),
        Plan::Pro.bot_slots(),
        Plan::Ultimate.price_usd(),
        Plan::Ultimate.hosting_days(),
        Plan::Ultimate.bot_slots(),
        support_contact
    )
}

pub fn plan_info_text(plan: Plan, support_contact: &str) -> String {
    format!(
        "💎 <b>{} PLAN</b> - ${}\n\n\
        • {} Days Bot Hosting\n\
        • {} Bot Deployment(s)\n\n\
        👉 Send ${} and your User ID to @{} to activate.\n\
        ✅ Fast activation after payment.",
        plan.label().to_uppercase(),
        plan.price_usd(),
        plan.hosting_days(),
        plan.bot_slots(),
        plan.price_usd(),
        support_contact
    )
}

pub fn payment_info_text(support_contact: &str) -> String {
    format!(
        "📞 <b>Payment Info</b>\n\n\
        Contact: @{}\n\n\
        Send your User ID and plan choice.\n\
        ✅ Fast activation after payment.",
        support_contact
    )
}

pub fn help_text(support_contact: &str) -> String {
    format!(
        "🆘 <b>HELP &amp; SUPPORT</b>\n\n\
        <b>Commands:</b>\n\
        /start - Main menu\n\
        /dashboard - Your hosting status\n\
        /referral - Referral link and stats\n\
        /premium - Premium plans\n\
        /deploy &lt;name&gt; &lt;token&gt; - Deploy your bot\n\
        /cancel &lt;id&gt; - Cancel a deployment\n\n\
        Questions? Contact @{}",
        support_contact
    )
}

pub fn deploy_help_text() -> String {
    "🤖 <b>Deploy Your Bot</b>\n\n\
    Send: /deploy &lt;name&gt; &lt;bot_token&gt;\n\n\
    Example:\n\
    <code>/deploy shopbot 123456:ABC-DEF</code>\n\n\
    Get a token from @BotFather first."
        .to_string()
}

pub fn deploy_success_text(deployment: &Deployment) -> String {
    let dashboard = deployment
        .railway_url
        .as_deref()
        .unwrap_or("pending")
        .to_string();
    format!(
        "🚀 <b>Bot Deployed!</b>\n\n\
        • Name: {}\n\
        • Deployment ID: <code>{}</code>\n\
        • Dashboard: {}\n\n\
        Stop it anytime with /cancel {}.",
        escape(&deployment.bot_name),
        deployment.id,
        dashboard,
        deployment.id
    )
}

pub fn deployments_text(deployments: &[Deployment]) -> String {
    if deployments.is_empty() {
        return "You have no deployments yet. Create one with /deploy.".to_string();
    }
    let mut text = "🤖 <b>YOUR DEPLOYMENTS</b>\n".to_string();
    for deployment in deployments {
        text.push_str(&format!(
            "\n• <code>{}</code> {} - {} ({})",
            deployment.id,
            escape(&deployment.bot_name),
            deployment.status.label(),
            format_date(deployment.created_at)
        ));
    }
    text.push_str("\n\nStop one with /cancel &lt;id&gt;.");
    text
}

pub fn admin_stats_text(stats: &AdminStats) -> String {
    format!(
        "👑 <b>ADMIN PANEL</b>\n\n\
        📊 <b>Statistics:</b>\n\
        • Total Users: {}\n\
        • Active Trials: {}\n\
        • Premium Users: {}\n\
        • Total Referrals: {}",
        stats.total_users, stats.active_trials, stats.premium_users, stats.total_referrals
    )
}

pub fn access_denied_text() -> String {
    "⛔ Access Denied!".to_string()
}

pub fn not_registered_text() -> String {
    "Please use /start first".to_string()
}

pub fn generic_error_text() -> String {
    "⚠️ Something went wrong. Please try again later.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdock_db::utils::now_second;
    use chrono::{Duration, TimeZone};

    fn sample_user() -> User {
        User {
            user_id: 42,
            username: Some("alice".to_string()),
            first_name: Some("Alice".to_string()),
            status: "active".to_string(),
            trial_end: None,
            plan: Plan::Trial,
            created_at: now_second(),
            trial_start: None,
            bot_expiry: None,
            bot_active: false,
            premium_status: false,
        }
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(
            format_remaining(RemainingTime::Left(
                Duration::days(3) + Duration::hours(2) + Duration::minutes(5)
            )),
            "3d 2h 5m"
        );
        assert_eq!(
            format_remaining(RemainingTime::Left(Duration::minutes(61))),
            "0d 1h 1m"
        );
        assert_eq!(format_remaining(RemainingTime::Expired), "EXPIRED");
        assert_eq!(format_remaining(RemainingTime::Unset), "Not set");
    }

    #[test]
    fn test_trial_started_renders_exact_end_date() {
        let end = Utc.with_ymd_and_hms(2026, 8, 25, 14, 30, 0).unwrap();
        let text = trial_started_text(3, end);
        assert!(text.contains("Expires: 25/08/2026 14:30"));
        assert!(text.contains("3 Days FREE Trial Activated"));
    }

    #[test]
    fn test_dashboard_renders_expiry_and_stats() {
        let mut user = sample_user();
        user.bot_expiry = Some(Utc.with_ymd_and_hms(2026, 8, 25, 14, 30, 0).unwrap());
        user.bot_active = true;

        let text = dashboard_text(&user, RemainingTime::Left(Duration::hours(26)), 3, 2, 2, 1);
        assert!(text.contains("User ID: <code>42</code>"));
        assert!(text.contains("Username: @alice"));
        assert!(text.contains("Plan: TRIAL"));
        assert!(text.contains("Status: 🟢 Active"));
        assert!(text.contains("Active Deployments: 1"));
        assert!(text.contains("Time Remaining: 1d 2h 0m"));
        assert!(text.contains("Expiry: 25/08/2026 14:30"));
        assert!(text.contains("Total Referrals: 3"));
        assert!(text.contains("Bonus Hours: 4 hours"));
        assert!(text.contains("Pending Bonus: 2 hours"));
    }

    #[test]
    fn test_dashboard_without_username_or_expiry() {
        let mut user = sample_user();
        user.username = None;

        let text = dashboard_text(&user, RemainingTime::Unset, 0, 0, 2, 0);
        assert!(text.contains("Username: @N/A"));
        assert!(text.contains("Time Remaining: Not set"));
        assert!(text.contains("Expiry: N/A"));
    }

    #[test]
    fn test_referral_text_cap_line() {
        let uncapped = referral_text("https://t.me/bot?start=42", 1, 1, 2, None);
        assert!(uncapped.contains("No limit on referrals!"));
        assert!(uncapped.contains("Bonus Hours Earned: 2 hours"));

        let capped = referral_text("https://t.me/bot?start=42", 5, 3, 2, Some(6));
        assert!(capped.contains("Bonus is capped at 6 hours"));
        assert!(capped.contains("Bonus Hours Earned: 6 hours"));
        assert!(capped.contains("Pending Bonus: 4 hours"));
    }

    #[test]
    fn test_welcome_escapes_name() {
        let text = welcome_text("<Alice>", 3, 2);
        assert!(text.contains("Hello &lt;Alice&gt;!"));
        assert!(!text.contains("<Alice>"));
    }

    #[test]
    fn test_deployments_text() {
        use botdock_db::models::deployment::DeploymentStatus;

        assert!(deployments_text(&[]).contains("no deployments yet"));

        let deployment = Deployment {
            id: 3,
            user_id: 42,
            bot_name: "shopbot".to_string(),
            status: DeploymentStatus::Deployed,
            files_uploaded: false,
            bot_token: None,
            railway_url: None,
            cancel_requested: false,
            created_at: Utc.with_ymd_and_hms(2026, 8, 25, 14, 30, 0).unwrap(),
            updated_at: now_second(),
        };
        let text = deployments_text(&[deployment]);
        assert!(text.contains("<code>3</code> shopbot - deployed (25/08/2026)"));
        assert!(text.contains("/cancel"));
    }

    #[test]
    fn test_premium_text_lists_catalog() {
        let text = premium_text("botdock_support");
        assert!(text.contains("BASIC PLAN</b> - $5/month"));
        assert!(text.contains("PRO PLAN</b> - $10/month"));
        assert!(text.contains("ULTIMATE PLAN</b> - $20/month"));
        assert!(text.contains("90 Days Bot Hosting"));
        assert!(text.contains("@botdock_support"));
    }
}
