//! Phone ownership lifecycle
//!
//! A phone enters inventory `available` through a buy agreement. From there:
//!
//! - a sell agreement moves it to `sold`, which is terminal;
//! - an assignment request moves it to `assigned`;
//! - approving the assignment returns it to `available` under the recipient;
//! - rejecting the assignment returns it to `available` under the sender.
//!
//! The functions here are pure. Services persist the resulting state and the
//! matching history row inside one transaction.

use super::values::{AssignmentStatus, HistoryAction, PhoneStatus};
use super::DomainError;

/// Something that happens to a phone after it is in inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneEvent {
    Sell,
    Assign,
    ApproveAssignment { recipient_id: i32 },
    RejectAssignment,
}

impl PhoneEvent {
    fn verb(&self) -> &'static str {
        match self {
            PhoneEvent::Sell => "sell",
            PhoneEvent::Assign => "assign",
            PhoneEvent::ApproveAssignment { .. } => "approve the assignment of",
            PhoneEvent::RejectAssignment => "reject the assignment of",
        }
    }

    /// The audit action recorded when this event is applied.
    pub fn history_action(&self) -> HistoryAction {
        match self {
            PhoneEvent::Sell => HistoryAction::Sell,
            PhoneEvent::Assign => HistoryAction::Assign,
            PhoneEvent::ApproveAssignment { .. } => HistoryAction::Approve,
            PhoneEvent::RejectAssignment => HistoryAction::Reject,
        }
    }
}

/// Status and owner, the two fields the lifecycle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneState {
    pub status: PhoneStatus,
    pub owner_id: i32,
}

impl PhoneState {
    /// State of a phone just bought into inventory by `owner_id`.
    pub fn acquired(owner_id: i32) -> Self {
        Self {
            status: PhoneStatus::Available,
            owner_id,
        }
    }

    pub fn apply(self, event: PhoneEvent) -> Result<PhoneState, DomainError> {
        use PhoneStatus::{Assigned, Available, Sold};

        let next = match (self.status, event) {
            (Available, PhoneEvent::Sell) => PhoneState {
                status: Sold,
                ..self
            },
            (Available, PhoneEvent::Assign) => PhoneState {
                status: Assigned,
                ..self
            },
            (Assigned, PhoneEvent::ApproveAssignment { recipient_id }) => PhoneState {
                status: Available,
                owner_id: recipient_id,
            },
            (Assigned, PhoneEvent::RejectAssignment) => PhoneState {
                status: Available,
                ..self
            },
            (Sold, _)
            | (Available, PhoneEvent::ApproveAssignment { .. })
            | (Available, PhoneEvent::RejectAssignment)
            | (Assigned, PhoneEvent::Sell)
            | (Assigned, PhoneEvent::Assign) => {
                return Err(DomainError::InvalidTransition {
                    from: self.status.to_string(),
                    event: event.verb().to_string(),
                })
            }
        };

        Ok(next)
    }
}

/// Recipient's answer to an assignment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentDecision {
    Approve,
    Reject,
}

impl AssignmentDecision {
    pub fn phone_event(&self, recipient_id: i32) -> PhoneEvent {
        match self {
            AssignmentDecision::Approve => PhoneEvent::ApproveAssignment { recipient_id },
            AssignmentDecision::Reject => PhoneEvent::RejectAssignment,
        }
    }
}

impl AssignmentStatus {
    /// Only pending requests can be decided; approved and rejected are final.
    pub fn decide(self, decision: AssignmentDecision) -> Result<AssignmentStatus, DomainError> {
        match (self, decision) {
            (AssignmentStatus::Pending, AssignmentDecision::Approve) => {
                Ok(AssignmentStatus::Approved)
            }
            (AssignmentStatus::Pending, AssignmentDecision::Reject) => {
                Ok(AssignmentStatus::Rejected)
            }
            (status, _) => Err(DomainError::Validation(format!(
                "Assignment is already {}",
                status
            ))),
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, AssignmentStatus::Pending)
    }
}
