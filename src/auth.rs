//! Gateway-authenticated caller identity and authorization predicates
//!
//! Authentication itself lives upstream: a trusted gateway terminates it and
//! forwards the caller's identity as headers, signed with a shared secret.
//! The row-level access rules of the data model are re-expressed here as
//! explicit predicates on [`Actor`], evaluated by the services before any
//! read or write.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::entities::prelude::*;
use crate::error::AppError;
use crate::services::UserService;
use crate::state::AppState;
use crate::utils;

pub const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// The authenticated caller, as stored in `users`.
///
/// `is_admin` always comes from the mirrored row, never from a header.
#[derive(Debug, Clone)]
pub struct Actor {
  pub id: i64,
  pub email: String,
  pub is_admin: bool,
}

impl Actor {
  /// Referrals and stats are visible to their owner and to admins.
  pub fn can_view_referrals_of(&self, owner_id: i64) -> bool {
    self.is_admin || self.id == owner_id
  }

  /// A referral is completed by the referred person (email match) or an
  /// admin acting on an onboarding event.
  pub fn can_complete(&self, referral: &ReferralModel) -> bool {
    self.is_admin || self.email.eq_ignore_ascii_case(&referral.referred_email)
  }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
  parts.headers.get(name).and_then(|value| value.to_str().ok())
}

impl FromRequestParts<Arc<AppState>> for Actor {
  type Rejection = AppError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    let secret =
      header(parts, GATEWAY_SECRET_HEADER).ok_or(AppError::Unauthenticated)?;
    if secret != state.config.gateway_secret {
      return Err(AppError::Unauthenticated);
    }

    let id: i64 = header(parts, USER_ID_HEADER)
      .and_then(|raw| raw.parse().ok())
      .ok_or(AppError::Unauthenticated)?;

    let email = header(parts, USER_EMAIL_HEADER)
      .map(utils::normalize_email)
      .filter(|email| utils::is_valid_email(email))
      .ok_or(AppError::Unauthenticated)?;

    let full_name = header(parts, USER_NAME_HEADER);

    let user = UserService::get_or_create(&state.db, id, &email, full_name).await?;

    Ok(Actor { id: user.id, email: user.email, is_admin: user.is_admin })
  }
}
