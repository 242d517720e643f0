use botdock_db::models::user::Plan;
use botdock_db::utils::now_second;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use crate::bot::{keyboards, views};
use crate::services::account_service;
use crate::services::deploy_service::DeployError;
use crate::services::referral_service::ReferralOutcome;
use crate::state::AppState;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Bot hosting commands")]
pub enum Command {
    #[command(description = "Register and open the main menu")]
    Start,
    #[command(description = "Your hosting dashboard")]
    Dashboard,
    #[command(description = "Your referral link and stats")]
    Referral,
    #[command(description = "Premium plans")]
    Premium,
    #[command(description = "Deploy a bot: /deploy <name> <token>")]
    Deploy,
    #[command(description = "Cancel a deployment: /cancel <id>")]
    Cancel,
    #[command(description = "Help and support")]
    Help,
    #[command(description = "Service statistics (admin)", hide)]
    Admin,
    #[command(description = "Grant a plan (admin)", hide)]
    Grant,
}

/// Arguments after the command word, e.g. "/deploy shop 123:ABC" -> ["shop", "123:ABC"].
fn command_args(msg: &Message) -> Vec<&str> {
    msg.text()
        .map(|text| text.split_whitespace().skip(1).collect())
        .unwrap_or_default()
}

/// Dashboard body for a registered user, None if /start was never sent.
pub(crate) async fn render_dashboard(
    state: &AppState,
    user_id: i64,
) -> anyhow::Result<Option<String>> {
    let Some(user) = state.account_service.get(user_id).await? else {
        return Ok(None);
    };
    let remaining = account_service::remaining_time_at(&user, now_second());
    let ref_count = state.referral_service.count_referrals(user_id).await?;
    let granted = state.referral_service.granted_count(user_id).await?;
    let active_deployments = state.deploy_service.active_count(user_id).await?;
    Ok(Some(views::dashboard_text(
        &user,
        remaining,
        ref_count,
        granted,
        state.referral_service.bonus_hours(),
        active_deployments,
    )))
}

/// Referral view body plus the deep link it advertises.
pub(crate) async fn render_referral(
    state: &AppState,
    bot: &Bot,
    user_id: i64,
) -> anyhow::Result<(String, String)> {
    let bot_me = bot.get_me().await.ok();
    let bot_username = bot_me
        .and_then(|m| m.username.clone())
        .unwrap_or_else(|| "bot".to_string());
    let link = format!("https://t.me/{}?start={}", bot_username, user_id);

    let ref_count = state.referral_service.count_referrals(user_id).await?;
    let granted = state.referral_service.granted_count(user_id).await?;
    let text = views::referral_text(
        &link,
        ref_count,
        granted,
        state.referral_service.bonus_hours(),
        state.config.referral_bonus_cap_hours,
    );
    Ok((text, link))
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;

    match cmd {
        Command::Start => {
            let registered = state
                .account_service
                .get_or_create(user_id, from.username.as_deref(), Some(&from.first_name))
                .await;
            let created = match registered {
                Ok((_, created)) => created,
                Err(e) => {
                    error!("Failed to register user {}: {:#}", user_id, e);
                    bot.send_message(msg.chat.id, views::generic_error_text())
                        .await?;
                    return Ok(());
                }
            };

            // Deep link payload: /start <referrer_id>. Only counts for brand new users.
            if created {
                let referrer = command_args(&msg)
                    .first()
                    .and_then(|arg| arg.parse::<i64>().ok());
                if let Some(referrer_id) = referrer {
                    match state
                        .referral_service
                        .record_referral(referrer_id, user_id)
                        .await
                    {
                        Ok(ReferralOutcome::Granted { .. }) => {
                            let bonus_hours = state.referral_service.bonus_hours();
                            let _ = bot
                                .send_message(msg.chat.id, views::referral_joined_text(bonus_hours))
                                .await;
                            // The referrer may have blocked the bot since registering.
                            let _ = bot
                                .send_message(
                                    ChatId(referrer_id),
                                    views::referrer_bonus_text(bonus_hours),
                                )
                                .await;
                        }
                        Ok(outcome) => {
                            info!(
                                "Referral {} -> {} not granted: {:?}",
                                referrer_id, user_id, outcome
                            );
                        }
                        Err(e) => {
                            error!(
                                "Failed to record referral {} -> {}: {:#}",
                                referrer_id, user_id, e
                            );
                        }
                    }
                }
            }

            bot.send_message(
                msg.chat.id,
                views::welcome_text(
                    &from.first_name,
                    state.account_service.trial_days(),
                    state.referral_service.bonus_hours(),
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::main_menu_keyboard())
            .await?;
        }
        Command::Dashboard => match render_dashboard(&state, user_id).await {
            Ok(Some(text)) => {
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboards::dashboard_keyboard(&state.config.support_url))
                    .await?;
            }
            Ok(None) => {
                bot.send_message(msg.chat.id, views::not_registered_text())
                    .await?;
            }
            Err(e) => {
                error!("Failed to build dashboard for {}: {:#}", user_id, e);
                bot.send_message(msg.chat.id, views::generic_error_text())
                    .await?;
            }
        },
        Command::Referral => match render_referral(&state, &bot, user_id).await {
            Ok((text, link)) => {
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboards::referral_keyboard(&link))
                    .await?;
            }
            Err(e) => {
                error!("Failed to build referral view for {}: {:#}", user_id, e);
                bot.send_message(msg.chat.id, views::generic_error_text())
                    .await?;
            }
        },
        Command::Premium => {
            bot.send_message(
                msg.chat.id,
                views::premium_text(&state.config.support_contact),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::premium_keyboard(&state.config.support_url))
            .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, views::help_text(&state.config.support_contact))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::back_keyboard())
                .await?;
        }
        Command::Deploy => {
            let args = command_args(&msg);
            let (Some(bot_name), Some(bot_token)) = (args.first(), args.get(1)) else {
                bot.send_message(msg.chat.id, views::deploy_help_text())
                    .parse_mode(ParseMode::Html)
                    .await?;
                return Ok(());
            };

            match state.deploy_service.deploy(user_id, bot_name, bot_token).await {
                Ok(deployment) => {
                    bot.send_message(msg.chat.id, views::deploy_success_text(&deployment))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(err) => {
                    let text = match err {
                        DeployError::Disabled => {
                            "❌ Deployment is not configured on this instance. Contact support."
                                .to_string()
                        }
                        DeployError::HostingInactive => {
                            "❌ Your hosting is not active. Start a trial with /start or pick a plan with /premium."
                                .to_string()
                        }
                        DeployError::SlotsExhausted(slots) => format!(
                            "❌ All {} bot slots of your plan are in use. Free one with /cancel or upgrade with /premium.",
                            slots
                        ),
                        DeployError::Other(e) => {
                            error!("Deployment failed for {}: {:#}", user_id, e);
                            views::generic_error_text()
                        }
                    };
                    bot.send_message(msg.chat.id, text).await?;
                }
            }
        }
        Command::Cancel => {
            let args = command_args(&msg);
            let Some(raw_id) = args.first() else {
                // Bare /cancel shows the deployments so the id is easy to find.
                match state.deploy_service.list(user_id).await {
                    Ok(deployments) => {
                        bot.send_message(msg.chat.id, views::deployments_text(&deployments))
                            .parse_mode(ParseMode::Html)
                            .await?;
                    }
                    Err(e) => {
                        error!("Failed to list deployments for {}: {:#}", user_id, e);
                        bot.send_message(msg.chat.id, views::generic_error_text())
                            .await?;
                    }
                }
                return Ok(());
            };
            let Ok(deployment_id) = raw_id.parse::<i64>() else {
                bot.send_message(msg.chat.id, "Usage: /cancel <deployment id>")
                    .await?;
                return Ok(());
            };

            match state.deploy_service.cancel(deployment_id, user_id).await {
                Ok(true) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("🛑 Deployment {} cancelled.", deployment_id),
                    )
                    .await?;
                }
                Ok(false) => {
                    bot.send_message(msg.chat.id, "❌ No matching active deployment found.")
                        .await?;
                }
                Err(e) => {
                    error!("Failed to cancel deployment {}: {:#}", deployment_id, e);
                    bot.send_message(msg.chat.id, views::generic_error_text())
                        .await?;
                }
            }
        }
        Command::Admin => {
            if !state.admin_service.is_admin(user_id) {
                bot.send_message(msg.chat.id, views::access_denied_text())
                    .await?;
                return Ok(());
            }
            match state.admin_service.stats().await {
                Ok(stats) => {
                    bot.send_message(msg.chat.id, views::admin_stats_text(&stats))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboards::admin_keyboard())
                        .await?;
                }
                Err(e) => {
                    error!("Failed to load admin stats: {:#}", e);
                    bot.send_message(msg.chat.id, views::generic_error_text())
                        .await?;
                }
            }
        }
        Command::Grant => {
            if !state.admin_service.is_admin(user_id) {
                bot.send_message(msg.chat.id, views::access_denied_text())
                    .await?;
                return Ok(());
            }
            let args = command_args(&msg);
            let (Some(Ok(target_id)), Some(plan_arg)) =
                (args.first().map(|arg| arg.parse::<i64>()), args.get(1))
            else {
                bot.send_message(msg.chat.id, "Usage: /grant <user_id> <plan>")
                    .await?;
                return Ok(());
            };
            let plan = match plan_arg.parse::<Plan>() {
                Ok(plan) => plan,
                Err(e) => {
                    bot.send_message(msg.chat.id, format!("❌ {}", e)).await?;
                    return Ok(());
                }
            };

            match state.admin_service.grant_plan(target_id, plan).await {
                Ok(Some(granted)) => {
                    bot.send_message(
                        msg.chat.id,
                        format!(
                            "✅ Granted {} to {} until {}.",
                            plan.label(),
                            granted.display_name(),
                            views::format_expiry(granted.bot_expiry)
                        ),
                    )
                    .await?;
                }
                Ok(None) => {
                    bot.send_message(msg.chat.id, format!("❌ User {} not found.", target_id))
                        .await?;
                }
                Err(e) => {
                    error!("Failed to grant {} to {}: {:#}", plan, target_id, e);
                    bot.send_message(msg.chat.id, views::generic_error_text())
                        .await?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_tolerate_trailing_args() {
        assert!(matches!(
            Command::parse("/start 12345", "botdock_bot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/deploy shopbot 123456:ABC-DEF", "botdock_bot"),
            Ok(Command::Deploy)
        ));
        assert!(matches!(
            Command::parse("/grant 7 pro", "botdock_bot"),
            Ok(Command::Grant)
        ));
    }
}
