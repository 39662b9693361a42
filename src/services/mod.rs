//! Services Layer
//!
//! Business operations over the models. Handlers stay thin: they extract the
//! caller and the payload, then call into one of these services.

pub mod account_service;
pub mod agreement_service;
pub mod assignment_service;
pub mod customer_service;
pub mod inventory_service;
pub mod sales_service;
pub mod target_service;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::domain::DomainError;
use crate::models::user;
use crate::modules::media::MediaError;

pub const MANAGER_REQUIRED: &str = "Access denied. Manager privileges required.";

/// Error type for service operations
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    NotFound(&'static str),
    Validation(String),
    InvalidState(String),
    Unauthorized(String),
    Forbidden(String),
    Database(String),
    Storage(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound(what) => write!(f, "{} not found", what),
            ServiceError::Validation(msg)
            | ServiceError::InvalidState(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::Forbidden(msg) => write!(f, "{}", msg),
            ServiceError::Database(msg) => write!(f, "Database error: {}", msg),
            ServiceError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Database(e.to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => ServiceError::NotFound("Record"),
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidTransition { .. } => ServiceError::InvalidState(e.to_string()),
            DomainError::UnknownValue { .. } => ServiceError::Validation(e.to_string()),
            DomainError::Database(msg) => ServiceError::Database(msg),
            DomainError::Internal(msg) => ServiceError::Database(msg),
        }
    }
}

impl From<MediaError> for ServiceError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::InvalidImage(msg) => ServiceError::Validation(format!("Invalid image: {}", msg)),
            MediaError::Io(msg) => ServiceError::Storage(msg),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Pages are 1-based in the API, 0-based in sea-orm.
pub(crate) fn page_index(page: Option<u64>) -> u64 {
    page.unwrap_or(1).max(1) - 1
}

pub(crate) fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation(format!("Invalid {}: expected YYYY-MM-DD", field)))
}

/// Bounds for comparing `YYYY-MM-DD HH:MM:SS` columns against a date range.
pub(crate) fn day_start(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

pub(crate) fn day_end(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format("%Y-%m-%d"))
}

pub(crate) fn require_manager(actor: &user::Model) -> Result<(), ServiceError> {
    if actor.can_manage() {
        Ok(())
    } else {
        tracing::warn!("User {} denied manager access", actor.username);
        Err(ServiceError::Forbidden(MANAGER_REQUIRED.to_string()))
    }
}

pub(crate) fn require_superuser(actor: &user::Model) -> Result<(), ServiceError> {
    if actor.is_superuser {
        Ok(())
    } else {
        tracing::warn!("User {} denied superuser access", actor.username);
        Err(ServiceError::Forbidden(
            "Access denied. Superuser privileges required.".to_string(),
        ))
    }
}

pub(crate) fn required(value: &str, message: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ServiceError::Validation(message.to_string()))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index_is_one_based() {
        assert_eq!(page_index(None), 0);
        assert_eq!(page_index(Some(0)), 0);
        assert_eq!(page_index(Some(3)), 2);
    }

    #[test]
    fn test_domain_transition_error_is_invalid_state() {
        let err: ServiceError = DomainError::InvalidTransition {
            from: "sold".to_string(),
            event: "assign".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
