//! Product Optimizer Core - Shared domain types.
//!
//! This crate provides the types shared by the optimizer components:
//! - `admin` - The Shopify-embedded merchant app (server, API, pages)
//! - `cli` - Command-line tools for migrations and token management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, subscription plans, prices, scores, and version statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
