//! Referral Rewards Server - referral codes, lifecycle and premium accrual
//!
//! Architecture:
//! - SeaORM for database access (Postgres in production, SQLite in tests)
//! - Axum for HTTP API with rate limiting
//! - Tokio for async runtime

mod auth;
mod entities;
mod error;
mod handlers;
mod migration;
mod prelude;
mod services;
mod state;
mod utils;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::prelude::*;
use crate::state::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  // Initialize tracing
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "referral=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  // Load configuration from environment
  let db_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
  let gateway_secret = env::var("GATEWAY_SECRET").context("GATEWAY_SECRET not set")?;

  info!("Starting Referral Server v{}", env!("CARGO_PKG_VERSION"));

  let app_state = Arc::new(AppState::new(&db_url, Config { gateway_secret }).await);

  // Configure rate limiting per client IP
  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(2)
      .burst_size(100)
      .finish()
      .context("Failed to build rate limiter config")?,
  );

  let governor_limiter = governor_conf.limiter().clone();

  // Spawn rate limiter cleanup task
  tokio::spawn(async move {
    loop {
      tokio::time::sleep(Duration::from_secs(60)).await;
      governor_limiter.retain_recent();
    }
  });

  // Build router with middleware
  let app = Router::new()
    // API endpoints
    .route("/api/referral/code", post(handlers::issue_code))
    .route("/api/referral/code/validate", get(handlers::validate_code))
    .route("/api/referral/apply", post(handlers::apply_code))
    .route("/api/referral/complete", post(handlers::complete_referral))
    .route("/api/referral/stats", get(handlers::stats))
    .route("/health", get(handlers::health))
    // Middleware
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app_state)
    .into_make_service_with_connect_info::<SocketAddr>();

  // Start HTTP server
  let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  let listener =
    tokio::net::TcpListener::bind(addr).await.context("Failed to bind")?;
  info!("HTTP server listening on {addr}");

  axum::serve(listener, app).await.context("Axum server error")?;

  Ok(())
}
