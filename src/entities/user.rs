//! User entity - account identity mirrored from the auth gateway

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  /// Assigned by the upstream auth system, never generated here.
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: i64,
  #[sea_orm(unique)]
  pub email: String,
  pub full_name: Option<String>,
  pub is_admin: bool,
  pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::referral_code::Entity")]
  ReferralCodes,
  #[sea_orm(has_many = "super::referral::Entity")]
  Referrals,
  #[sea_orm(has_one = "super::referral_reward::Entity")]
  ReferralReward,
}

impl Related<super::referral_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ReferralCodes.def()
  }
}

impl Related<super::referral::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Referrals.def()
  }
}

impl Related<super::referral_reward::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ReferralReward.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
