//! ReferralReward entity - per-referrer accrual counter and premium grant

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_rewards")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub user_id: i64,
  /// Monotone; only ever changed by relative `+ 1` updates.
  pub completed_referrals: i32,
  /// Flips false -> true exactly once, when the threshold is first reached.
  pub premium_granted: bool,
  pub premium_granted_at: Option<NaiveDateTime>,
  pub premium_expires_at: Option<NaiveDateTime>,
  pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Id"
  )]
  User,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
