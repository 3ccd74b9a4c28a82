//! Business logic services.
//!
//! # Services
//!
//! - `billing` - Plan selection, confirmation and usage charges
//! - `optimizer` - Token-gated optimization runs

pub mod billing;
pub mod optimizer;

pub use billing::{BillingService, PlanSelection};
pub use optimizer::{OptimizationOutcome, OptimizerService};
