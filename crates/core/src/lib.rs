//! Teeshop Core - shared domain library.
//!
//! Used by:
//! - `storefront` - the JSON API server
//! - `cli` - migrations, seeding and account management
//!
//! # Architecture
//!
//! The core crate holds types and pure rules only - no I/O, no database
//! access, no HTTP clients. Postgres encodings for the newtypes sit behind
//! the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses
//! - [`access`] - Role gate deciding which roles may use an operation
//! - [`reviews`] - Embedded product reviews and their rating aggregate
//! - [`query`] - Search, filter and pagination shaping for listings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod query;
pub mod reviews;
pub mod types;

pub use access::{Forbidden, RoleGate};
pub use types::*;
