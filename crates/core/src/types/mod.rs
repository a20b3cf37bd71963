//! Core types for Teeshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod email;
pub mod id;
pub mod image;
pub mod price;
pub mod role;
pub mod status;

pub use category::Category;
pub use email::{Email, EmailError};
pub use id::*;
pub use image::ImageRef;
pub use price::{Price, PriceError};
pub use role::{Role, RoleError};
pub use status::{OrderStatus, StatusError};
