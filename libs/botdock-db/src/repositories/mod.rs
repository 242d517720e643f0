pub mod deployment_repo;
pub mod referral_repo;
pub mod user_repo;

pub use deployment_repo::DeploymentRepository;
pub use referral_repo::ReferralRepository;
pub use user_repo::UserRepository;
