//! User service - mirrors gateway-provisioned identities

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

use crate::entities::prelude::*;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::utils;

pub struct UserService;

impl UserService {
  /// Get or create a user row for a gateway-authenticated identity.
  ///
  /// Two first requests for the same new user may race; the loser re-reads
  /// the winner's row.
  pub async fn get_or_create<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    email: &str,
    full_name: Option<&str>,
  ) -> AppResult<UserModel> {
    if let Some(user) = User::find_by_id(id).one(conn).await? {
      return Ok(user);
    }

    let now = Utc::now().naive_utc();
    let user = UserActiveModel {
      id: Set(id),
      email: Set(utils::normalize_email(email)),
      full_name: Set(full_name.map(str::to_owned)),
      is_admin: Set(false),
      created_at: Set(now),
    };

    match user.insert(conn).await {
      Ok(user) => Ok(user),
      Err(err) if is_unique_violation(&err) => User::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("user {id} vanished after insert race"))),
      Err(err) => Err(err.into()),
    }
  }

  pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: i64,
  ) -> AppResult<Option<UserModel>> {
    let user = User::find_by_id(id).one(conn).await?;
    Ok(user)
  }
}
