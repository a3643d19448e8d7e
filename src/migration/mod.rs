//! Database migrations using SeaORM

use sea_orm_migration::prelude::*;

mod m20260808_000001_create_users;
mod m20260808_000002_create_referral_codes;
mod m20260808_000003_create_referrals;
mod m20260808_000004_create_referral_rewards;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260808_000001_create_users::Migration),
      Box::new(m20260808_000002_create_referral_codes::Migration),
      Box::new(m20260808_000003_create_referrals::Migration),
      Box::new(m20260808_000004_create_referral_rewards::Migration),
    ]
  }
}
