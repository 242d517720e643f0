pub mod account_service;
pub mod admin_service;
pub mod deploy_service;
pub mod referral_service;
