//! Referral entity - tracks one referred email through its lifecycle

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Referral lifecycle status.
///
/// `pending` may move to `completed` or `expired`; both of those are
/// terminal. Expiry is observed lazily against `expires_at`, not swept.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReferralStatus {
  #[sea_orm(string_value = "pending")]
  Pending,
  #[sea_orm(string_value = "completed")]
  Completed,
  #[sea_orm(string_value = "expired")]
  Expired,
}

impl Default for ReferralStatus {
  fn default() -> Self {
    Self::Pending
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub referrer_id: i64,
  pub code_id: i64,
  /// Globally unique: an email can be referred at most once, ever.
  #[sea_orm(unique)]
  pub referred_email: String,
  pub status: ReferralStatus,
  pub created_at: NaiveDateTime,
  pub completed_at: Option<NaiveDateTime>,
  pub expires_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::ReferrerId",
    to = "super::user::Column::Id"
  )]
  Referrer,
  #[sea_orm(
    belongs_to = "super::referral_code::Entity",
    from = "Column::CodeId",
    to = "super::referral_code::Column::Id"
  )]
  Code,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Referrer.def()
  }
}

impl Related<super::referral_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Code.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
