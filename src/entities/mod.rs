//! SeaORM Entity definitions
//!
//! This module contains all database entity definitions for the referral
//! service.

pub mod prelude;
pub mod referral;
pub mod referral_code;
pub mod referral_reward;
pub mod user;
