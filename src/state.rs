use crate::migration::Migrator;
use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  /// Shared secret the auth gateway signs identity headers with.
  pub gateway_secret: String,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn new(db_url: &str, config: Config) -> Self {
    info!("Connecting to database...");
    let db =
      Database::connect(db_url).await.expect("Failed to connect to database");

    info!("Running migrations...");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    Self { db, config }
  }
}
