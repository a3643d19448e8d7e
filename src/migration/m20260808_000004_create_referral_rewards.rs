use sea_orm_migration::prelude::*;

use super::m20260808_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ReferralRewards::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ReferralRewards::UserId)
              .big_integer()
              .not_null()
              .primary_key(),
          )
          .col(
            ColumnDef::new(ReferralRewards::CompletedReferrals)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(ReferralRewards::PremiumGranted)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(ReferralRewards::PremiumGrantedAt).date_time().null())
          .col(ColumnDef::new(ReferralRewards::PremiumExpiresAt).date_time().null())
          .col(ColumnDef::new(ReferralRewards::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_referral_rewards_user")
              .from(ReferralRewards::Table, ReferralRewards::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ReferralRewards::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ReferralRewards {
  Table,
  UserId,
  CompletedReferrals,
  PremiumGranted,
  PremiumGrantedAt,
  PremiumExpiresAt,
  UpdatedAt,
}
