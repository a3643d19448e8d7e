//! Code service - issues and validates referral codes

use chrono::Utc;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
  QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::referral_code;
use crate::entities::prelude::*;
use crate::error::{AppError, AppResult, is_unique_violation};

/// Business-visible code shape: `HB-` + 8 uppercase hex characters.
pub const CODE_PREFIX: &str = "HB-";
const CODE_HEX_LEN: usize = 8;

/// 32 bits of entropy make collisions vanishingly rare; the unique index on
/// the code column catches the rest.
const MAX_ISSUE_ATTEMPTS: usize = 5;

pub struct CodeService;

impl CodeService {
  fn generate() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let tag = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{CODE_PREFIX}{tag:08X}")
  }

  /// Pure shape check, no I/O.
  pub fn validate_format(code: &str) -> bool {
    match code.strip_prefix(CODE_PREFIX) {
      Some(rest) => {
        rest.len() == CODE_HEX_LEN
          && rest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
      }
      None => false,
    }
  }

  pub async fn active_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
  ) -> AppResult<Option<ReferralCodeModel>> {
    let code = ReferralCode::find()
      .filter(referral_code::Column::UserId.eq(user_id))
      .filter(referral_code::Column::IsActive.eq(true))
      .one(conn)
      .await?;
    Ok(code)
  }

  /// Idempotent issuance: a user who already has an active code gets it
  /// back, anyone else gets a freshly generated one.
  ///
  /// A unique violation means either the generated string collided or a
  /// concurrent request for the same user won the active-code slot, so each
  /// retry re-reads before generating again.
  pub async fn issue_or_get(
    db: &DatabaseConnection,
    user_id: i64,
  ) -> AppResult<(ReferralCodeModel, bool)> {
    for _ in 0..MAX_ISSUE_ATTEMPTS {
      if let Some(existing) = Self::active_for_user(db, user_id).await? {
        return Ok((existing, false));
      }

      let now = Utc::now().naive_utc();
      let code = ReferralCodeActiveModel {
        user_id: Set(user_id),
        code: Set(Self::generate()),
        is_active: Set(true),
        created_at: Set(now),
        ..Default::default()
      };

      match code.insert(db).await {
        Ok(code) => return Ok((code, true)),
        Err(err) if is_unique_violation(&err) => continue,
        Err(err) => return Err(err.into()),
      }
    }

    Err(AppError::Internal(format!(
      "could not issue a referral code for user {user_id}"
    )))
  }

  /// Look up an active code by its exact string.
  pub async fn find_active<C: ConnectionTrait>(
    conn: &C,
    code: &str,
  ) -> AppResult<Option<ReferralCodeModel>> {
    let code = ReferralCode::find()
      .filter(referral_code::Column::Code.eq(code))
      .filter(referral_code::Column::IsActive.eq(true))
      .one(conn)
      .await?;
    Ok(code)
  }

  /// Public availability check: does this exact string name an active code?
  pub async fn validate_active(db: &DatabaseConnection, code: &str) -> AppResult<bool> {
    let found = Self::find_active(db, code).await?;
    Ok(found.is_some())
  }
}
