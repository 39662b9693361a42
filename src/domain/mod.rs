//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM entities, no Axum).
//! Status enums, the phone lifecycle, sale arithmetic and domain errors.

pub mod errors;
pub mod finance;
pub mod lifecycle;
pub mod values;

pub use errors::DomainError;
pub use lifecycle::{AssignmentDecision, PhoneEvent, PhoneState};
pub use values::*;
