//! Error types for the referral service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("Malformed referral code")]
  CodeFormat,

  #[error("Malformed email address")]
  EmailFormat,

  #[error("Referral code not found or inactive")]
  CodeNotActive,

  #[error("Own email cannot be referred")]
  SelfReferral,

  #[error("Email has already been referred")]
  EmailAlreadyReferred,

  #[error("Referral not found")]
  ReferralNotFound,

  #[error("Referral expired")]
  ReferralExpired,

  #[error("Missing or invalid credentials")]
  Unauthenticated,

  #[error("Not allowed")]
  Forbidden,

  #[error("Internal error: {0}")]
  Internal(String),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
      AppError::CodeFormat => (StatusCode::BAD_REQUEST, "Malformed referral code"),
      AppError::EmailFormat => (StatusCode::BAD_REQUEST, "Malformed email address"),
      AppError::CodeNotActive => {
        (StatusCode::NOT_FOUND, "Referral code not found or inactive")
      }
      AppError::SelfReferral => (StatusCode::FORBIDDEN, "Own email cannot be referred"),
      AppError::EmailAlreadyReferred => {
        (StatusCode::CONFLICT, "Email has already been referred")
      }
      AppError::ReferralNotFound => (StatusCode::NOT_FOUND, "Referral not found"),
      AppError::ReferralExpired => (StatusCode::GONE, "Referral expired"),
      AppError::Unauthenticated => {
        (StatusCode::UNAUTHORIZED, "Missing or invalid credentials")
      }
      AppError::Forbidden => (StatusCode::FORBIDDEN, "Not allowed"),
      AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type AppResult<T> = Result<T, AppError>;

/// Storage-level duplicate detection; uniqueness constraints are the
/// authoritative guard for racing writers.
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
  matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
}
