//! Referral service - drives a referral from application to completion
//!
//! The lifecycle is pending -> completed or pending -> expired; both ends
//! are terminal. Expiry is lazy: nothing rewrites stale rows, `complete`
//! rejects them and the stats fold classifies them.

use chrono::{NaiveDateTime, TimeDelta, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
  TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::referral;
use crate::entities::prelude::*;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::services::{CodeService, RewardService};
use crate::utils;

/// Window a referred person has to finish onboarding.
pub const REFERRAL_TTL_DAYS: i64 = 30;

/// Per-referrer aggregate returned by the stats endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
  pub total: u64,
  pub completed: u64,
  pub pending: u64,
  pub expired: u64,
  pub active_code: Option<String>,
  pub reward: Option<RewardSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSnapshot {
  pub completed_referrals: i32,
  pub premium_granted: bool,
  pub premium_granted_at: Option<NaiveDateTime>,
  pub premium_expires_at: Option<NaiveDateTime>,
}

impl From<ReferralRewardModel> for RewardSnapshot {
  fn from(reward: ReferralRewardModel) -> Self {
    Self {
      completed_referrals: reward.completed_referrals,
      premium_granted: reward.premium_granted,
      premium_granted_at: reward.premium_granted_at,
      premium_expires_at: reward.premium_expires_at,
    }
  }
}

pub struct ReferralService;

impl ReferralService {
  /// Apply a referral code on behalf of a prospective user.
  ///
  /// Validation is fail-fast and writes nothing: code shape, active code,
  /// self-referral, email never referred before. The insert and the
  /// creation of the referrer's reward row share one transaction. Races on
  /// the same email are settled by the unique index: the second writer's
  /// violation surfaces as the same already-referred error.
  pub async fn apply_code(
    db: &DatabaseConnection,
    code: &str,
    referred_email: &str,
  ) -> AppResult<ReferralModel> {
    if !CodeService::validate_format(code) {
      return Err(AppError::CodeFormat);
    }

    let referred_email = utils::normalize_email(referred_email);
    if !utils::is_valid_email(&referred_email) {
      return Err(AppError::EmailFormat);
    }

    let txn = db.begin().await?;

    let code = CodeService::find_active(&txn, code).await?.ok_or(AppError::CodeNotActive)?;

    let owner = User::find_by_id(code.user_id)
      .one(&txn)
      .await?
      .ok_or_else(|| AppError::Internal(format!("code {} has no owner", code.id)))?;
    if owner.email == referred_email {
      return Err(AppError::SelfReferral);
    }

    let taken = Referral::find()
      .filter(referral::Column::ReferredEmail.eq(&referred_email))
      .one(&txn)
      .await?;
    if taken.is_some() {
      return Err(AppError::EmailAlreadyReferred);
    }

    let now = Utc::now().naive_utc();
    let referral = ReferralActiveModel {
      id: Set(Uuid::new_v4()),
      referrer_id: Set(code.user_id),
      code_id: Set(code.id),
      referred_email: Set(referred_email),
      status: Set(ReferralStatus::Pending),
      created_at: Set(now),
      completed_at: Set(None),
      expires_at: Set(now + TimeDelta::days(REFERRAL_TTL_DAYS)),
    };

    let referral = match referral.insert(&txn).await {
      Ok(referral) => referral,
      Err(err) if is_unique_violation(&err) => return Err(AppError::EmailAlreadyReferred),
      Err(err) => return Err(err.into()),
    };

    // The accrual engine always has a target row from here on.
    RewardService::ensure_row(&txn, referral.referrer_id, now).await?;

    txn.commit().await?;
    Ok(referral)
  }

  /// Mark a pending referral completed and accrue the referrer's reward.
  ///
  /// The status flip is a conditional update filtered on `pending`, so a
  /// racing second completion observes zero affected rows and fails like
  /// any other non-pending referral. Flip and accrual share the
  /// transaction: a referral is never `completed` without its reward
  /// effect, and vice versa.
  pub async fn complete(
    db: &DatabaseConnection,
    actor: &Actor,
    referral_id: Uuid,
  ) -> AppResult<ReferralModel> {
    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let referral = Referral::find_by_id(referral_id)
      .one(&txn)
      .await?
      .ok_or(AppError::ReferralNotFound)?;

    if !actor.can_complete(&referral) {
      return Err(AppError::Forbidden);
    }

    if referral.status != ReferralStatus::Pending {
      return Err(AppError::ReferralNotFound);
    }

    if now > referral.expires_at {
      // rejected, not rewritten: the row keeps its pending status
      return Err(AppError::ReferralExpired);
    }

    let flipped = Referral::update_many()
      .col_expr(referral::Column::Status, Expr::value(ReferralStatus::Completed))
      .col_expr(referral::Column::CompletedAt, Expr::value(Some(now)))
      .filter(referral::Column::Id.eq(referral_id))
      .filter(referral::Column::Status.eq(ReferralStatus::Pending))
      .exec(&txn)
      .await?;
    if flipped.rows_affected == 0 {
      return Err(AppError::ReferralNotFound);
    }

    RewardService::apply_completion(&txn, referral.referrer_id, now).await?;

    let completed = Referral::find_by_id(referral_id)
      .one(&txn)
      .await?
      .ok_or_else(|| AppError::Internal(format!("referral {referral_id} vanished")))?;

    txn.commit().await?;
    Ok(completed)
  }

  /// Read-only aggregate for a referrer: status counts, reward snapshot,
  /// active code. A pending row past its expiry counts as expired even
  /// though nothing has written the status back yet.
  pub async fn stats(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
  ) -> AppResult<ReferralStats> {
    if !actor.can_view_referrals_of(user_id) {
      return Err(AppError::Forbidden);
    }

    let now = Utc::now().naive_utc();
    let referrals = Referral::find()
      .filter(referral::Column::ReferrerId.eq(user_id))
      .all(db)
      .await?;

    let mut completed = 0;
    let mut pending = 0;
    let mut expired = 0;
    for referral in &referrals {
      match referral.status {
        ReferralStatus::Completed => completed += 1,
        ReferralStatus::Expired => expired += 1,
        ReferralStatus::Pending if now > referral.expires_at => expired += 1,
        ReferralStatus::Pending => pending += 1,
      }
    }

    let active_code = CodeService::active_for_user(db, user_id).await?;
    let reward = RewardService::get(db, user_id).await?;

    Ok(ReferralStats {
      total: referrals.len() as u64,
      completed,
      pending,
      expired,
      active_code: active_code.map(|code| code.code),
      reward: reward.map(RewardSnapshot::from),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::reward::PREMIUM_THRESHOLD;
  use crate::services::testing::{seed_user, setup_test_db};

  fn actor(id: i64, email: &str) -> Actor {
    Actor { id, email: email.to_string(), is_admin: false }
  }

  fn admin(id: i64, email: &str) -> Actor {
    Actor { id, email: email.to_string(), is_admin: true }
  }

  async fn seed_referrer(db: &DatabaseConnection, id: i64, email: &str) -> String {
    seed_user(db, id, email).await;
    let (code, _) = CodeService::issue_or_get(db, id).await.unwrap();
    code.code
  }

  async fn force_expiry(db: &DatabaseConnection, referral: ReferralModel) {
    let stale = Utc::now().naive_utc() - TimeDelta::days(1);
    let mut active: ReferralActiveModel = referral.into();
    active.expires_at = Set(stale);
    active.update(db).await.unwrap();
  }

  #[tokio::test]
  async fn apply_creates_a_pending_referral_with_a_month_window() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();

    assert_eq!(referral.referrer_id, 1);
    assert_eq!(referral.referred_email, "v@example.com");
    assert_eq!(referral.status, ReferralStatus::Pending);
    assert!(referral.completed_at.is_none());
    assert_eq!(
      referral.expires_at - referral.created_at,
      TimeDelta::days(REFERRAL_TTL_DAYS)
    );

    // the accrual row exists from the moment of application
    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    assert_eq!(reward.completed_referrals, 0);
    assert!(!reward.premium_granted);
  }

  #[tokio::test]
  async fn apply_rejects_malformed_codes_before_touching_storage() {
    let db = setup_test_db().await;

    let result = ReferralService::apply_code(&db, "not-a-code", "v@example.com").await;
    assert!(matches!(result, Err(AppError::CodeFormat)));

    let result = ReferralService::apply_code(&db, "HB-00ffaa12", "v@example.com").await;
    assert!(matches!(result, Err(AppError::CodeFormat)));
  }

  #[tokio::test]
  async fn apply_rejects_malformed_emails() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let result = ReferralService::apply_code(&db, &code, "not-an-email").await;
    assert!(matches!(result, Err(AppError::EmailFormat)));
  }

  #[tokio::test]
  async fn apply_rejects_unknown_codes() {
    let db = setup_test_db().await;
    seed_referrer(&db, 1, "u@example.com").await;

    let result =
      ReferralService::apply_code(&db, "HB-00000000", "v@example.com").await;
    assert!(matches!(result, Err(AppError::CodeNotActive)));
  }

  #[tokio::test]
  async fn apply_rejects_self_referral() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let result = ReferralService::apply_code(&db, &code, "u@example.com").await;
    assert!(matches!(result, Err(AppError::SelfReferral)));

    // case and whitespace variance do not dodge the check
    let result = ReferralService::apply_code(&db, &code, "  U@Example.COM ").await;
    assert!(matches!(result, Err(AppError::SelfReferral)));
  }

  #[tokio::test]
  async fn an_email_can_be_referred_once_ever() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;
    let other = seed_referrer(&db, 2, "w@example.com").await;

    ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();

    // same code while the referral is still pending
    let result = ReferralService::apply_code(&db, &code, "v@example.com").await;
    assert!(matches!(result, Err(AppError::EmailAlreadyReferred)));

    // a different referrer's code changes nothing
    let result = ReferralService::apply_code(&db, &other, "v@example.com").await;
    assert!(matches!(result, Err(AppError::EmailAlreadyReferred)));

    // nor does case variance
    let result = ReferralService::apply_code(&db, &other, "V@EXAMPLE.COM").await;
    assert!(matches!(result, Err(AppError::EmailAlreadyReferred)));
  }

  #[tokio::test]
  async fn complete_flips_status_and_accrues_one() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();

    let completed =
      ReferralService::complete(&db, &actor(2, "v@example.com"), referral.id)
        .await
        .unwrap();

    assert_eq!(completed.status, ReferralStatus::Completed);
    assert!(completed.completed_at.is_some());

    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    assert_eq!(reward.completed_referrals, 1);
    assert!(!reward.premium_granted);
  }

  #[tokio::test]
  async fn complete_requires_the_referred_person_or_an_admin() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();

    let result =
      ReferralService::complete(&db, &actor(3, "stranger@example.com"), referral.id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    // nothing moved
    let untouched =
      Referral::find_by_id(referral.id).one(&db).await.unwrap().unwrap();
    assert_eq!(untouched.status, ReferralStatus::Pending);
    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    assert_eq!(reward.completed_referrals, 0);

    let completed =
      ReferralService::complete(&db, &admin(99, "ops@example.com"), referral.id)
        .await
        .unwrap();
    assert_eq!(completed.status, ReferralStatus::Completed);
  }

  #[tokio::test]
  async fn complete_is_terminal() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();
    let me = actor(2, "v@example.com");

    ReferralService::complete(&db, &me, referral.id).await.unwrap();

    let result = ReferralService::complete(&db, &me, referral.id).await;
    assert!(matches!(result, Err(AppError::ReferralNotFound)));

    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    assert_eq!(reward.completed_referrals, 1);
  }

  #[tokio::test]
  async fn complete_rejects_unknown_referrals() {
    let db = setup_test_db().await;
    seed_referrer(&db, 1, "u@example.com").await;

    let result =
      ReferralService::complete(&db, &admin(99, "ops@example.com"), Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(AppError::ReferralNotFound)));
  }

  #[tokio::test]
  async fn complete_rejects_expired_referrals_and_leaves_them_pending() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();
    force_expiry(&db, referral.clone()).await;

    let result =
      ReferralService::complete(&db, &actor(2, "v@example.com"), referral.id).await;
    assert!(matches!(result, Err(AppError::ReferralExpired)));

    let stale = Referral::find_by_id(referral.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stale.status, ReferralStatus::Pending);
    assert!(stale.completed_at.is_none());

    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    assert_eq!(reward.completed_referrals, 0);
  }

  #[tokio::test]
  async fn complete_rolls_back_when_accrual_fails() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    let referral =
      ReferralService::apply_code(&db, &code, "v@example.com").await.unwrap();

    // break the accrual target: the increment inside complete() now fails
    ReferralReward::delete_by_id(1i64).exec(&db).await.unwrap();

    let result =
      ReferralService::complete(&db, &actor(2, "v@example.com"), referral.id).await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    // the status flip must have rolled back with it
    let untouched =
      Referral::find_by_id(referral.id).one(&db).await.unwrap().unwrap();
    assert_eq!(untouched.status, ReferralStatus::Pending);
    assert!(untouched.completed_at.is_none());
  }

  #[tokio::test]
  async fn ten_completions_grant_premium() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;

    for n in 1..=PREMIUM_THRESHOLD {
      let email = format!("friend{n}@example.com");
      let referral = ReferralService::apply_code(&db, &code, &email).await.unwrap();
      ReferralService::complete(&db, &actor(100 + n as i64, &email), referral.id)
        .await
        .unwrap();

      let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
      assert_eq!(reward.completed_referrals, n);
      assert_eq!(reward.premium_granted, n >= PREMIUM_THRESHOLD);
    }

    let reward = RewardService::get(&db, 1).await.unwrap().unwrap();
    let granted_at = reward.premium_granted_at.expect("grant timestamp");
    let expires_at = reward.premium_expires_at.expect("grant expiry");
    assert_eq!(expires_at - granted_at, TimeDelta::days(30));
  }

  #[tokio::test]
  async fn stats_fold_statuses_and_lazy_expiry() {
    let db = setup_test_db().await;
    let code = seed_referrer(&db, 1, "u@example.com").await;
    let me = actor(1, "u@example.com");

    let done =
      ReferralService::apply_code(&db, &code, "a@example.com").await.unwrap();
    ReferralService::complete(&db, &actor(2, "a@example.com"), done.id)
      .await
      .unwrap();

    let stale =
      ReferralService::apply_code(&db, &code, "b@example.com").await.unwrap();
    force_expiry(&db, stale).await;

    ReferralService::apply_code(&db, &code, "c@example.com").await.unwrap();

    let stats = ReferralService::stats(&db, &me, 1).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.active_code, Some(code));

    let reward = stats.reward.expect("reward snapshot");
    assert_eq!(reward.completed_referrals, 1);
    assert!(!reward.premium_granted);
  }

  #[tokio::test]
  async fn stats_are_owner_or_admin_only() {
    let db = setup_test_db().await;
    seed_referrer(&db, 1, "u@example.com").await;

    let result = ReferralService::stats(&db, &actor(2, "w@example.com"), 1).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let stats =
      ReferralService::stats(&db, &admin(99, "ops@example.com"), 1).await.unwrap();
    assert_eq!(stats.total, 0);
    assert!(stats.active_code.is_some());
    assert!(stats.reward.is_none());
  }
}
