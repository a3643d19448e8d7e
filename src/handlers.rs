use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::prelude::*;
use crate::prelude::*;
use crate::services::referral::ReferralStats;
use crate::services::{CodeService, ReferralService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRes {
  pub success: bool,
  pub code: String,
  pub is_new: bool,
}

pub async fn issue_code(
  State(app): State<Arc<AppState>>,
  actor: Actor,
) -> AppResult<Json<IssueCodeRes>> {
  let (code, is_new) = CodeService::issue_or_get(&app.db, actor.id).await?;
  if is_new {
    info!(user = actor.id, code = %code.code, "issued referral code");
  }
  Ok(Json(IssueCodeRes { success: true, code: code.code, is_new }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
  pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateRes {
  pub valid: bool,
}

/// Public availability check; format failures never reach the database.
pub async fn validate_code(
  State(app): State<Arc<AppState>>,
  Query(query): Query<ValidateQuery>,
) -> AppResult<Json<ValidateRes>> {
  if !CodeService::validate_format(&query.code) {
    return Ok(Json(ValidateRes { valid: false }));
  }

  let valid = CodeService::validate_active(&app.db, &query.code).await?;
  Ok(Json(ValidateRes { valid }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCodeReq {
  pub referral_code: String,
  pub user_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCodeRes {
  pub success: bool,
  pub referral_id: Uuid,
  pub referrer_id: i64,
  pub created_at: DateTime,
  pub expires_at: DateTime,
}

pub async fn apply_code(
  State(app): State<Arc<AppState>>,
  Json(req): Json<ApplyCodeReq>,
) -> AppResult<Json<ApplyCodeRes>> {
  let referral =
    ReferralService::apply_code(&app.db, &req.referral_code, &req.user_email).await?;

  info!(referral = %referral.id, referrer = referral.referrer_id, "referral created");

  Ok(Json(ApplyCodeRes {
    success: true,
    referral_id: referral.id,
    referrer_id: referral.referrer_id,
    created_at: referral.created_at,
    expires_at: referral.expires_at,
  }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteReq {
  pub referral_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRes {
  pub success: bool,
  pub referral: ReferralModel,
}

pub async fn complete_referral(
  State(app): State<Arc<AppState>>,
  actor: Actor,
  Json(req): Json<CompleteReq>,
) -> AppResult<Json<CompleteRes>> {
  let referral = ReferralService::complete(&app.db, &actor, req.referral_id).await?;

  info!(referral = %referral.id, referrer = referral.referrer_id, "referral completed");

  Ok(Json(CompleteRes { success: true, referral }))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
  /// Admins may ask about any referrer; everyone else gets themselves.
  pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StatsRes {
  pub success: bool,
  pub stats: ReferralStats,
}

pub async fn stats(
  State(app): State<Arc<AppState>>,
  actor: Actor,
  Query(query): Query<StatsQuery>,
) -> AppResult<Json<StatsRes>> {
  let user_id = query.user_id.unwrap_or(actor.id);
  let stats = ReferralService::stats(&app.db, &actor, user_id).await?;
  Ok(Json(StatsRes { success: true, stats }))
}

pub async fn health() -> &'static str {
  "OK"
}
