//! Application status transitions.
//!
//! ```text
//! Draft -> ApplicationCreated -> AgreementCreated -> Scoring
//! Scoring -> EmploymentCheck | Approved | Rejected
//! EmploymentCheck -> Approved | Rejected
//! ```
//!
//! `Approved` and `Rejected` are terminal.

use crate::entities::ApplicationStatus;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("application is already in status {0}")]
    NoOp(ApplicationStatus),

    #[error("application is in terminal status {0}")]
    Terminal(ApplicationStatus),

    #[error("invalid transition from {from} to {to}")]
    Invalid {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transitioned {
    pub status: ApplicationStatus,
    pub updated_at: OffsetDateTime,
}

/// Validate moving from `current` to `requested`.
///
/// The no-op check runs before the terminal check, so `Approved -> Approved`
/// reports `NoOp`.
pub fn transition(
    current: ApplicationStatus,
    requested: ApplicationStatus,
    now: OffsetDateTime,
) -> Result<Transitioned, TransitionError> {
    if requested == current {
        return Err(TransitionError::NoOp(current));
    }
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }
    if !current.next_statuses().contains(&requested) {
        return Err(TransitionError::Invalid {
            from: current,
            to: requested,
        });
    }
    Ok(Transitioned {
        status: requested,
        updated_at: now,
    })
}
