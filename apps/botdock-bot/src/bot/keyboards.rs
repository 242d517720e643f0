use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "🚀 Start FREE Trial",
            "start_trial",
        )],
        vec![InlineKeyboardButton::callback("💰 Buy Premium", "buy_premium")],
        vec![InlineKeyboardButton::callback(
            "📊 My Dashboard",
            "my_dashboard",
        )],
        vec![InlineKeyboardButton::callback("🎁 Refer & Earn", "referral")],
        vec![
            InlineKeyboardButton::callback("🤖 Deploy a Bot", "deploy_help"),
            InlineKeyboardButton::callback("🆘 Help", "help"),
        ],
    ])
}

pub fn dashboard_keyboard(support_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🤖 Deploy My Bot", "deploy_help"),
            InlineKeyboardButton::callback("🔄 Refresh", "refresh_dash"),
        ],
        vec![
            InlineKeyboardButton::url("🆘 Support", support_url.clone()),
            InlineKeyboardButton::callback("💰 Upgrade", "buy_premium"),
        ],
        vec![InlineKeyboardButton::callback("🎁 Refer & Earn", "referral")],
        vec![InlineKeyboardButton::callback("⬅️ Main Menu", "main_menu")],
    ])
}

pub fn premium_keyboard(support_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🚀 Basic - $5", "plan_basic"),
            InlineKeyboardButton::callback("🔥 Pro - $10", "plan_pro"),
        ],
        vec![InlineKeyboardButton::callback(
            "💎 Ultimate - $20",
            "plan_ultimate",
        )],
        vec![
            InlineKeyboardButton::url("📞 Contact Admin", support_url.clone()),
            InlineKeyboardButton::callback("💳 Payment Info", "payment_info"),
        ],
        vec![InlineKeyboardButton::callback("⬅️ Main Menu", "main_menu")],
    ])
}

pub fn referral_keyboard(referral_link: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::switch_inline_query(
            "📤 Share Now",
            format!("Host your Telegram bot for free: {}", referral_link),
        )],
        vec![
            InlineKeyboardButton::callback("📊 My Dashboard", "my_dashboard"),
            InlineKeyboardButton::callback("⬅️ Main Menu", "main_menu"),
        ],
    ])
}

pub fn admin_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔄 Refresh",
        "admin_refresh",
    )]])
}

pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ Main Menu",
        "main_menu",
    )]])
}
