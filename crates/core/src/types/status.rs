//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusError {
    /// The order already reached the terminal stage.
    #[error("order is already delivered")]
    AlreadyDelivered,
    /// The requested stage is not after the current one.
    #[error("cannot move order from {from} to {to}")]
    NotForward {
        /// Current stage.
        from: OrderStatus,
        /// Requested stage.
        to: OrderStatus,
    },
}

/// Order status, in lifecycle order.
///
/// Orders move strictly forward: `placed` → `processing` → `shipped` →
/// `delivered`. Skipping stages is allowed, moving back or staying put is
/// not, and nothing leaves `delivered`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// Whether no further transition is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Validate a transition from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::AlreadyDelivered` from the terminal stage and
    /// `StatusError::NotForward` when `next` is not strictly later.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusError> {
        if self.is_terminal() {
            return Err(StatusError::AlreadyDelivered);
        }
        if next <= self {
            return Err(StatusError::NotForward {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placed" => Ok(Self::Placed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
