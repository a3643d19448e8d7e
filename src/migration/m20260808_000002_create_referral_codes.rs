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
          .table(ReferralCodes::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ReferralCodes::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ReferralCodes::UserId).big_integer().not_null())
          .col(ColumnDef::new(ReferralCodes::Code).string().not_null().unique_key())
          .col(
            ColumnDef::new(ReferralCodes::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(ReferralCodes::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_referral_codes_user")
              .from(ReferralCodes::Table, ReferralCodes::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referral_codes_user")
          .table(ReferralCodes::Table)
          .col(ReferralCodes::UserId)
          .to_owned(),
      )
      .await?;

    // Partial unique index: sea-query's index builder cannot express the
    // WHERE clause, but both Postgres and SQLite accept it verbatim.
    manager
      .get_connection()
      .execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_referral_codes_active_user \
         ON referral_codes (user_id) WHERE is_active",
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ReferralCodes::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ReferralCodes {
  Table,
  Id,
  UserId,
  Code,
  IsActive,
  CreatedAt,
}
