use crate::config::Config;
use crate::services::account_service::AccountService;
use crate::services::admin_service::AdminService;
use crate::services::deploy_service::DeployService;
use crate::services::referral_service::ReferralService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub account_service: AccountService,
    pub referral_service: ReferralService,
    pub admin_service: AdminService,
    pub deploy_service: DeployService,
}
