//! Core types for the product optimizer.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod plan;
pub mod price;
pub mod score;
pub mod status;

pub use id::*;
pub use plan::{PlanError, SubscriptionPlan, UsageCharge};
pub use price::{CurrencyCode, Price};
pub use score::{Score, ScoreBand};
pub use status::*;
