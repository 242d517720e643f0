use anyhow::Result;
use botdock_db::models::deployment::Deployment;
use botdock_db::repositories::{DeploymentRepository, UserRepository};
use botdock_db::utils::now_second;
use thiserror::Error;
use tracing::{error, info};

use crate::railway::{service_slug, RailwayClient};
use crate::services::account_service::{remaining_time_at, RemainingTime};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deployment is not configured on this instance")]
    Disabled,
    #[error("hosting is not active")]
    HostingInactive,
    #[error("all {0} bot slots are in use")]
    SlotsExhausted(i64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct DeployService {
    users: UserRepository,
    deployments: DeploymentRepository,
    railway: Option<RailwayClient>,
}

impl DeployService {
    pub fn new(
        users: UserRepository,
        deployments: DeploymentRepository,
        railway: Option<RailwayClient>,
    ) -> Self {
        Self {
            users,
            deployments,
            railway,
        }
    }

    /// Provisions one hosted bot for the user: token goes into a project
    /// variable, then a service instance is created referencing it. The
    /// deployment row tracks what happened; a Railway failure marks it
    /// failed and frees the slot.
    pub async fn deploy(
        &self,
        user_id: i64,
        bot_name: &str,
        bot_token: &str,
    ) -> Result<Deployment, DeployError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DeployError::HostingInactive)?;
        if !matches!(remaining_time_at(&user, now_second()), RemainingTime::Left(_)) {
            return Err(DeployError::HostingInactive);
        }

        let slots = user.plan.bot_slots();
        let active = self.deployments.count_active_for(user_id).await?;
        if active >= slots {
            return Err(DeployError::SlotsExhausted(slots));
        }

        let railway = self.railway.as_ref().ok_or(DeployError::Disabled)?;

        let deployment = self
            .deployments
            .insert(user_id, bot_name, Some(bot_token))
            .await?;

        let slug = service_slug(bot_name, user_id);
        let created = async {
            railway.upsert_variable(user_id, bot_token).await?;
            railway.create_service(&slug, user_id).await
        }
        .await;

        match created {
            Ok(service) => {
                info!(
                    "Railway service {} ({}) created at {} for user {}",
                    service.name, service.id, service.created_at, user_id
                );
                let url = railway.service_url(&service.id);
                self.deployments
                    .mark_deployed(deployment.id, Some(&url))
                    .await?;
                self.users.set_bot_active(user_id, true).await?;
                let deployed = self
                    .deployments
                    .get(deployment.id)
                    .await?
                    .unwrap_or(deployment);
                Ok(deployed)
            }
            Err(e) => {
                error!("Deployment {} for user {} failed: {:#}", deployment.id, user_id, e);
                if let Err(mark_err) = self.deployments.mark_failed(deployment.id).await {
                    error!("Could not mark deployment {} failed: {:#}", deployment.id, mark_err);
                }
                Err(DeployError::Other(e))
            }
        }
    }

    pub async fn cancel(&self, deployment_id: i64, user_id: i64) -> Result<bool> {
        let cancelled = self.deployments.request_cancel(deployment_id, user_id).await?;
        if cancelled {
            info!("Deployment {} cancelled by user {}", deployment_id, user_id);
            if self.deployments.count_active_for(user_id).await? == 0 {
                self.users.set_bot_active(user_id, false).await?;
            }
        }
        Ok(cancelled)
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Deployment>> {
        self.deployments.list_for(user_id).await
    }

    pub async fn active_count(&self, user_id: i64) -> Result<i64> {
        self.deployments.count_active_for(user_id).await
    }
}
