//! Reward service - accrues completed referrals and grants premium
//!
//! Every mutation here runs on the caller's connection, which for the
//! completion path is the same transaction that flips the referral status:
//! the accrual and the status change commit or roll back together.

use chrono::{NaiveDateTime, TimeDelta};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::referral_reward;
use crate::entities::prelude::*;
use crate::error::{AppError, AppResult, is_unique_violation};

/// Completed referrals required before premium is granted.
pub const PREMIUM_THRESHOLD: i32 = 10;
/// The grant is time-boxed, not permanent.
pub const PREMIUM_DURATION_DAYS: i64 = 30;

pub struct RewardService;

impl RewardService {
  pub async fn get<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
  ) -> AppResult<Option<ReferralRewardModel>> {
    let reward = ReferralReward::find_by_id(user_id).one(conn).await?;
    Ok(reward)
  }

  /// Create the accrual row with a zero count if the referrer does not have
  /// one yet. Concurrent creators are tolerated: the loser's unique
  /// violation means the row now exists, which is all this guarantees.
  pub async fn ensure_row<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    now: NaiveDateTime,
  ) -> AppResult<()> {
    if ReferralReward::find_by_id(user_id).one(conn).await?.is_some() {
      return Ok(());
    }

    let row = ReferralRewardActiveModel {
      user_id: Set(user_id),
      completed_referrals: Set(0),
      premium_granted: Set(false),
      premium_granted_at: Set(None),
      premium_expires_at: Set(None),
      updated_at: Set(now),
    };

    match row.insert(conn).await {
      Ok(_) => Ok(()),
      Err(err) if is_unique_violation(&err) => Ok(()),
      Err(err) => Err(err.into()),
    }
  }

  /// Record one completed referral for `user_id` and grant premium when the
  /// count first reaches the threshold.
  ///
  /// The increment is relative (`completed_referrals + 1` in SQL), never a
  /// read-then-write, so concurrent completions for the same referrer
  /// cannot lose updates. The grant is a conditional update filtered on
  /// `premium_granted = false`: the flag flips once and repeated crossings
  /// change nothing.
  pub async fn apply_completion<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    now: NaiveDateTime,
  ) -> AppResult<ReferralRewardModel> {
    let updated = ReferralReward::update_many()
      .col_expr(
        referral_reward::Column::CompletedReferrals,
        Expr::col(referral_reward::Column::CompletedReferrals).add(1),
      )
      .col_expr(referral_reward::Column::UpdatedAt, Expr::value(now))
      .filter(referral_reward::Column::UserId.eq(user_id))
      .exec(conn)
      .await?;

    if updated.rows_affected == 0 {
      // applyCode guarantees the row exists before any completion
      return Err(AppError::Internal(format!("reward row missing for user {user_id}")));
    }

    let reward = Self::get(conn, user_id)
      .await?
      .ok_or_else(|| AppError::Internal(format!("reward row missing for user {user_id}")))?;

    if reward.completed_referrals >= PREMIUM_THRESHOLD && !reward.premium_granted {
      let granted = ReferralReward::update_many()
        .col_expr(referral_reward::Column::PremiumGranted, Expr::value(true))
        .col_expr(referral_reward::Column::PremiumGrantedAt, Expr::value(Some(now)))
        .col_expr(
          referral_reward::Column::PremiumExpiresAt,
          Expr::value(Some(now + TimeDelta::days(PREMIUM_DURATION_DAYS))),
        )
        .col_expr(referral_reward::Column::UpdatedAt, Expr::value(now))
        .filter(referral_reward::Column::UserId.eq(user_id))
        .filter(referral_reward::Column::PremiumGranted.eq(false))
        .exec(conn)
        .await?;

      if granted.rows_affected > 0 {
        return Self::get(conn, user_id).await?.ok_or_else(|| {
          AppError::Internal(format!("reward row missing for user {user_id}"))
        });
      }
    }

    Ok(reward)
  }
}
