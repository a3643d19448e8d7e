//! Entity prelude for convenient imports

pub use super::referral::{
  ActiveModel as ReferralActiveModel, Entity as Referral, Model as ReferralModel,
  ReferralStatus,
};
pub use super::referral_code::{
  ActiveModel as ReferralCodeActiveModel, Entity as ReferralCode,
  Model as ReferralCodeModel,
};
pub use super::referral_reward::{
  ActiveModel as ReferralRewardActiveModel, Entity as ReferralReward,
  Model as ReferralRewardModel,
};
pub use super::user::{ActiveModel as UserActiveModel, Entity as User, Model as UserModel};
