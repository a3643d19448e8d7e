use sea_orm_migration::prelude::*;

use super::m20260808_000001_create_users::Users;
use super::m20260808_000002_create_referral_codes::ReferralCodes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Referrals::Table)
          .if_not_exists()
          .col(ColumnDef::new(Referrals::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Referrals::ReferrerId).big_integer().not_null())
          .col(ColumnDef::new(Referrals::CodeId).big_integer().not_null())
          .col(
            ColumnDef::new(Referrals::ReferredEmail)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(
            ColumnDef::new(Referrals::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Referrals::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Referrals::CompletedAt).date_time().null())
          .col(ColumnDef::new(Referrals::ExpiresAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_referrals_referrer")
              .from(Referrals::Table, Referrals::ReferrerId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_referrals_code")
              .from(Referrals::Table, Referrals::CodeId)
              .to(ReferralCodes::Table, ReferralCodes::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referrals_referrer")
          .table(Referrals::Table)
          .col(Referrals::ReferrerId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Referrals::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Referrals {
  Table,
  Id,
  ReferrerId,
  CodeId,
  ReferredEmail,
  Status,
  CreatedAt,
  CompletedAt,
  ExpiresAt,
}
