use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod railway;
mod services;
mod state;

use botdock_db::repositories::{DeploymentRepository, ReferralRepository, UserRepository};

use crate::config::Config;
use crate::railway::RailwayClient;
use crate::services::account_service::AccountService;
use crate::services::admin_service::AdminService;
use crate::services::deploy_service::DeployService;
use crate::services::referral_service::ReferralService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botdock_bot=debug,botdock_db=debug,teloxide=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BotDock bot...");

    let config = Config::from_env()?;
    let pool = botdock_db::init_db(&config.database_url).await?;

    let users = UserRepository::new(pool.clone());
    let referrals = ReferralRepository::new(pool.clone());
    let deployments = DeploymentRepository::new(pool.clone());

    let railway = match config.railway.clone() {
        Some(cfg) => Some(RailwayClient::new(
            cfg.token,
            cfg.project_id,
            cfg.service_image,
        )),
        None => {
            warn!("RAILWAY_TOKEN not set, bot deployments are disabled");
            None
        }
    };

    let account_service = AccountService::new(users.clone(), config.trial_days);
    let referral_service = ReferralService::new(
        pool.clone(),
        referrals.clone(),
        config.referral_bonus_hours,
        config.referral_bonus_cap_hours,
    );
    let admin_service =
        AdminService::new(users.clone(), referrals.clone(), config.admin_ids.clone());
    let deploy_service = DeployService::new(users, deployments, railway);

    let state = AppState {
        config: config.clone(),
        account_service,
        referral_service,
        admin_service,
        deploy_service,
    };

    let bot = Bot::new(&config.bot_token);

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    bot::run_bot(bot, shutdown_rx, state).await;

    info!("Bot stopped");
    Ok(())
}
