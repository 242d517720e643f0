use anyhow::Context;
use chrono::{DateTime, Utc};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::{dptree, prelude::*, types::Update};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Hosted bot commands")]
enum Command {
    #[command(description = "What this bot can do")]
    Start,
    #[command(description = "Get help")]
    Help,
    #[command(description = "Your Telegram ID")]
    Myid,
}

#[derive(Clone)]
struct BotEnv {
    support_url: Url,
}

/// Canned replies checked in order against the lowercased message.
/// The time reply is handled separately so it stays last.
const KEYWORD_REPLIES: [(&str, &str); 5] = [
    ("hello", "Hello there! 👋"),
    ("hi", "Hi! How can I help? 😊"),
    ("price", "💰 Contact the hosting service for pricing!"),
    ("help", "Use /help command for assistance!"),
    ("bot", "🤖 Yes, I'm a bot! Hosted for free!"),
];

fn keyword_reply(text: &str, now: DateTime<Utc>) -> Option<String> {
    if text.starts_with('/') {
        return None;
    }
    let lowered = text.to_lowercase();
    for (keyword, reply) in KEYWORD_REPLIES {
        if lowered.contains(keyword) {
            return Some(reply.to_string());
        }
    }
    if lowered.contains("time") {
        return Some(format!("🕐 Current time: {}", now.format("%H:%M:%S UTC")));
    }
    None
}

fn welcome_text(first_name: &str) -> String {
    format!(
        "🤖 Hello {}! I'm your personal bot!\n\n\
        I'm hosted for FREE on BotDock!\n\n\
        ⚡ My Features:\n\
        • Instant replies\n\
        • 24/7 Online\n\
        • Custom commands\n\n\
        Try these commands:\n\
        /start - This message\n\
        /help - Get help\n\
        /myid - Your Telegram ID",
        first_name
    )
}

fn features_text() -> String {
    "⚡ Bot Features:\n\n\
    • Fast responses\n\
    • Always online\n\
    • Free hosting\n\
    • Custom branding\n\n\
    Want your own bot like this?\n\
    Contact the hosting service!"
        .to_string()
}

fn welcome_keyboard(support_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🚀 My Features", "features")],
        vec![InlineKeyboardButton::url(
            "🆘 Get Support",
            support_url.clone(),
        )],
    ])
}

async fn command_handler(bot: Bot, msg: Message, cmd: Command, env: BotEnv) -> ResponseResult<()> {
    match cmd {
        Command::Start | Command::Help => {
            let first_name = msg
                .from
                .as_ref()
                .map(|u| u.first_name.as_str())
                .unwrap_or("there");
            bot.send_message(msg.chat.id, welcome_text(first_name))
                .reply_markup(welcome_keyboard(&env.support_url))
                .await?;
        }
        Command::Myid => {
            let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or_default();
            bot.send_message(msg.chat.id, format!("Your ID: <code>{}</code>", user_id))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

async fn callback_handler(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    let callback_id = q.id.clone();
    let Some(data) = q.data.as_deref() else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };
    let _ = bot.answer_callback_query(callback_id).await;

    if data == "features" {
        if let Some(message) = q.message.as_ref() {
            bot.edit_message_text(message.chat().id, message.id(), features_text())
                .await?;
        }
    }
    Ok(())
}

async fn text_handler(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if let Some(reply) = keyword_reply(text, Utc::now()) {
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botdock_userbot=debug,teloxide=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let token = std::env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
    let owner_id: i64 = std::env::var("OWNER_ID")
        .context("OWNER_ID is not set")?
        .parse()
        .context("OWNER_ID must be a numeric Telegram ID")?;
    let support_contact =
        std::env::var("SUPPORT_CONTACT").unwrap_or_else(|_| "botdock_support".to_string());
    let support_url = Url::parse(&format!(
        "https://t.me/{}",
        support_contact.trim_start_matches('@')
    ))
    .context("SUPPORT_CONTACT does not form a valid t.me link")?;

    info!("Starting hosted bot for owner {}", owner_id);

    let env = BotEnv { support_url };
    let bot = Bot::new(token);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(text_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![env])
        .default_handler(|upd: std::sync::Arc<Update>| async move {
            info!("Unhandled update: {:?}", upd);
        })
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_keyword_reply_matches_in_order() {
        let now = Utc.with_ymd_and_hms(2026, 8, 22, 10, 0, 0).unwrap();
        assert_eq!(
            keyword_reply("hello bot", now).as_deref(),
            Some("Hello there! 👋")
        );
        assert_eq!(
            keyword_reply("what is the PRICE", now).as_deref(),
            Some("💰 Contact the hosting service for pricing!")
        );
    }

    #[test]
    fn test_keyword_reply_time_is_last() {
        let now = Utc.with_ymd_and_hms(2026, 8, 22, 10, 30, 5).unwrap();
        assert_eq!(
            keyword_reply("what time is it", now).as_deref(),
            Some("🕐 Current time: 10:30:05 UTC")
        );
        // "time to deploy my bot" still prefers the earlier keyword
        assert_eq!(
            keyword_reply("time to deploy my bot", now).as_deref(),
            Some("🤖 Yes, I'm a bot! Hosted for free!")
        );
    }

    #[test]
    fn test_keyword_reply_skips_commands_and_unknown_text() {
        let now = Utc::now();
        assert_eq!(keyword_reply("/start", now), None);
        assert_eq!(keyword_reply("/help me now", now), None);
        assert_eq!(keyword_reply("good morning", now), None);
    }
}
