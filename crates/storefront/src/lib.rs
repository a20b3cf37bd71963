//! Teeshop storefront: the JSON API behind the apparel shop.
//!
//! Accounts with role-gated access, a searchable catalog with embedded
//! reviews, orders, Stripe/Razorpay payment intents and Cloudinary images.
//! Exposed as a library so the router can be built and exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
