//! Business logic services

pub mod code;
pub mod referral;
pub mod reward;
pub mod user;

pub use code::CodeService;
pub use referral::ReferralService;
pub use reward::RewardService;
pub use user::UserService;
