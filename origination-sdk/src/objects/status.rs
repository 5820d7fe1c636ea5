use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Credit application status for API payloads and event tags.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `origination-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    ApplicationCreated,
    AgreementCreated,
    Scoring,
    EmploymentCheck,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Draft,
        ApplicationStatus::ApplicationCreated,
        ApplicationStatus::AgreementCreated,
        ApplicationStatus::Scoring,
        ApplicationStatus::EmploymentCheck,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    /// The textual tag used on the wire and in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::ApplicationCreated => "APPLICATION_CREATED",
            ApplicationStatus::AgreementCreated => "AGREEMENT_CREATED",
            ApplicationStatus::Scoring => "SCORING",
            ApplicationStatus::EmploymentCheck => "EMPLOYMENT_CHECK",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name any known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
