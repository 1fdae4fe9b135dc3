//! Storefront E-commerce Backend
//!
//! Self-hosted shop backend: catalog, cart, orders and the admin tooling
//! around them.
//!
//! ## Features
//! - Order lifecycle with guest checkout and a cancel-request workflow
//! - Role-gated access policy (user, moderator, admin)
//! - Product catalog, cart and checkout with price snapshots
//! - Product ratings and contact messages
//! - Admin user management

pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::policy::AccessDenied;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Error kinds surfaced by every operation; the HTTP layer maps each kind to
/// a status code.
#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Resource was modified concurrently, retry the request")]
    Conflict,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

impl From<AccessDenied> for EcommerceError {
    fn from(e: AccessDenied) -> Self {
        match e {
            AccessDenied::Unauthorized => Self::Unauthorized,
            AccessDenied::Forbidden(_) => Self::Forbidden(e.to_string()),
        }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::NegativePrice { .. }
            | OrderError::TotalOverflow
            | OrderError::InvalidPhone(_)
            | OrderError::ReasonTooLong(_) => Self::Validation(e.to_string()),
            OrderError::NotCancellable(_)
            | OrderError::CancelAlreadyPending
            | OrderError::TransitionNotAllowed { .. } => Self::InvalidState(e.to_string()),
            OrderError::NoPendingCancelRequest => Self::NotFound(e.to_string()),
        }
    }
}

impl From<StoreError> for EcommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => Self::Conflict,
            StoreError::NotFound => Self::NotFound("Not found".to_string()),
            StoreError::Rejected(reason) => Self::Validation(reason),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}
