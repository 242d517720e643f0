pub mod deployment;
pub mod referral;
pub mod user;
