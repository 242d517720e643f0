use botdock_db::models::user::Plan;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info};

use crate::bot::handlers::command::{render_dashboard, render_referral};
use crate::bot::{keyboards, views};
use crate::services::account_service::TrialStart;
use crate::state::AppState;

/// Every callback token the keyboards can emit. Unknown data from stale
/// messages falls through to a "send /start" answer instead of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    StartTrial,
    BuyPremium,
    MyDashboard,
    RefreshDash,
    Referral,
    Help,
    DeployHelp,
    PlanBasic,
    PlanPro,
    PlanUltimate,
    PaymentInfo,
    MainMenu,
    AdminRefresh,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "start_trial" => Some(Self::StartTrial),
            "buy_premium" => Some(Self::BuyPremium),
            "my_dashboard" => Some(Self::MyDashboard),
            "refresh_dash" => Some(Self::RefreshDash),
            "referral" => Some(Self::Referral),
            "help" => Some(Self::Help),
            "deploy_help" => Some(Self::DeployHelp),
            "plan_basic" => Some(Self::PlanBasic),
            "plan_pro" => Some(Self::PlanPro),
            "plan_ultimate" => Some(Self::PlanUltimate),
            "payment_info" => Some(Self::PaymentInfo),
            "main_menu" => Some(Self::MainMenu),
            "admin_refresh" => Some(Self::AdminRefresh),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::StartTrial => "start_trial",
            Self::BuyPremium => "buy_premium",
            Self::MyDashboard => "my_dashboard",
            Self::RefreshDash => "refresh_dash",
            Self::Referral => "referral",
            Self::Help => "help",
            Self::DeployHelp => "deploy_help",
            Self::PlanBasic => "plan_basic",
            Self::PlanPro => "plan_pro",
            Self::PlanUltimate => "plan_ultimate",
            Self::PaymentInfo => "payment_info",
            Self::MainMenu => "main_menu",
            Self::AdminRefresh => "admin_refresh",
        }
    }
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let user_id = q.from.id.0 as i64;

    let Some(data) = q.data.as_deref() else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };

    let Some(action) = CallbackAction::parse(data) else {
        let _ = bot
            .answer_callback_query(callback_id)
            .text("Unknown action, send /start")
            .await;
        return Ok(());
    };

    let _ = bot.answer_callback_query(callback_id).await;

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    match action {
        CallbackAction::StartTrial => match state.account_service.start_trial(user_id).await {
            Ok(TrialStart::Started { trial_end }) => {
                bot.edit_message_text(
                    chat_id,
                    message_id,
                    views::trial_started_text(state.account_service.trial_days(), trial_end),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::dashboard_keyboard(&state.config.support_url))
                .await?;
            }
            Ok(TrialStart::AlreadyActive {
                trial_start,
                trial_end,
            }) => {
                bot.edit_message_text(
                    chat_id,
                    message_id,
                    views::trial_already_active_text(trial_start, trial_end),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::back_keyboard())
                .await?;
            }
            Ok(TrialStart::NotRegistered) => {
                bot.edit_message_text(chat_id, message_id, views::not_registered_text())
                    .await?;
            }
            Err(e) => {
                error!("Failed to start trial for {}: {:#}", user_id, e);
                bot.edit_message_text(chat_id, message_id, views::generic_error_text())
                    .await?;
            }
        },
        CallbackAction::MyDashboard | CallbackAction::RefreshDash => {
            match render_dashboard(&state, user_id).await {
                Ok(Some(text)) => {
                    // Refresh with unchanged data hits "message is not modified".
                    let _ = bot
                        .edit_message_text(chat_id, message_id, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboards::dashboard_keyboard(&state.config.support_url))
                        .await
                        .map_err(|e| info!("Dashboard edit skipped for {}: {}", user_id, e));
                }
                Ok(None) => {
                    bot.edit_message_text(chat_id, message_id, views::not_registered_text())
                        .await?;
                }
                Err(e) => {
                    error!("Failed to build dashboard for {}: {:#}", user_id, e);
                    bot.edit_message_text(chat_id, message_id, views::generic_error_text())
                        .await?;
                }
            }
        }
        CallbackAction::Referral => match render_referral(&state, &bot, user_id).await {
            Ok((text, link)) => {
                bot.edit_message_text(chat_id, message_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboards::referral_keyboard(&link))
                    .await?;
            }
            Err(e) => {
                error!("Failed to build referral view for {}: {:#}", user_id, e);
                bot.edit_message_text(chat_id, message_id, views::generic_error_text())
                    .await?;
            }
        },
        CallbackAction::BuyPremium => {
            bot.edit_message_text(
                chat_id,
                message_id,
                views::premium_text(&state.config.support_contact),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::premium_keyboard(&state.config.support_url))
            .await?;
        }
        CallbackAction::PlanBasic | CallbackAction::PlanPro | CallbackAction::PlanUltimate => {
            let plan = match action {
                CallbackAction::PlanBasic => Plan::Basic,
                CallbackAction::PlanPro => Plan::Pro,
                _ => Plan::Ultimate,
            };
            bot.edit_message_text(
                chat_id,
                message_id,
                views::plan_info_text(plan, &state.config.support_contact),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::back_keyboard())
            .await?;
        }
        CallbackAction::PaymentInfo => {
            bot.edit_message_text(
                chat_id,
                message_id,
                views::payment_info_text(&state.config.support_contact),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::back_keyboard())
            .await?;
        }
        CallbackAction::Help => {
            bot.edit_message_text(
                chat_id,
                message_id,
                views::help_text(&state.config.support_contact),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::back_keyboard())
            .await?;
        }
        CallbackAction::DeployHelp => {
            bot.edit_message_text(chat_id, message_id, views::deploy_help_text())
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::back_keyboard())
                .await?;
        }
        CallbackAction::MainMenu => {
            bot.edit_message_text(
                chat_id,
                message_id,
                views::welcome_text(
                    &q.from.first_name,
                    state.account_service.trial_days(),
                    state.referral_service.bonus_hours(),
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::main_menu_keyboard())
            .await?;
        }
        CallbackAction::AdminRefresh => {
            if !state.admin_service.is_admin(user_id) {
                bot.edit_message_text(chat_id, message_id, views::access_denied_text())
                    .await?;
                return Ok(());
            }
            match state.admin_service.stats().await {
                Ok(stats) => {
                    let _ = bot
                        .edit_message_text(chat_id, message_id, views::admin_stats_text(&stats))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboards::admin_keyboard())
                        .await
                        .map_err(|e| info!("Admin stats edit skipped: {}", e));
                }
                Err(e) => {
                    error!("Failed to load admin stats: {:#}", e);
                    bot.edit_message_text(chat_id, message_id, views::generic_error_text())
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
    use crate::bot::keyboards;
    use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

    const ALL_ACTIONS: [CallbackAction; 13] = [
        CallbackAction::StartTrial,
        CallbackAction::BuyPremium,
        CallbackAction::MyDashboard,
        CallbackAction::RefreshDash,
        CallbackAction::Referral,
        CallbackAction::Help,
        CallbackAction::DeployHelp,
        CallbackAction::PlanBasic,
        CallbackAction::PlanPro,
        CallbackAction::PlanUltimate,
        CallbackAction::PaymentInfo,
        CallbackAction::MainMenu,
        CallbackAction::AdminRefresh,
    ];

    fn assert_tokens_route(markup: &InlineKeyboardMarkup) {
        for row in &markup.inline_keyboard {
            for button in row {
                if let InlineKeyboardButtonKind::CallbackData(data) = &button.kind {
                    assert!(
                        CallbackAction::parse(data).is_some(),
                        "keyboard emits unroutable token: {}",
                        data
                    );
                }
            }
        }
    }

    #[test]
    fn test_token_round_trip() {
        for action in ALL_ACTIONS {
            assert_eq!(CallbackAction::parse(action.token()), Some(action));
        }
        assert_eq!(CallbackAction::parse("copy_ref_link"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn test_every_keyboard_token_is_routable() {
        let support = reqwest::Url::parse("https://t.me/botdock_support").unwrap();
        assert_tokens_route(&keyboards::main_menu_keyboard());
        assert_tokens_route(&keyboards::dashboard_keyboard(&support));
        assert_tokens_route(&keyboards::premium_keyboard(&support));
        assert_tokens_route(&keyboards::referral_keyboard("https://t.me/b?start=1"));
        assert_tokens_route(&keyboards::admin_keyboard());
        assert_tokens_route(&keyboards::back_keyboard());
    }
}
