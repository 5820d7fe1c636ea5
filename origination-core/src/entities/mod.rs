pub mod credit_application;

pub use credit_application::{
    ApplicationTerms, CreditApplication, NewCreditApplication, ValidationError,
};

use origination_sdk::objects::ApplicationStatus as SdkApplicationStatus;

/// Credit application status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `origination_sdk::objects::ApplicationStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "application_status")]
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
    /// Statuses reachable from `self` in one step.
    pub const fn next_statuses(&self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Draft => &[ApplicationStatus::ApplicationCreated],
            ApplicationStatus::ApplicationCreated => &[ApplicationStatus::AgreementCreated],
            ApplicationStatus::AgreementCreated => &[ApplicationStatus::Scoring],
            ApplicationStatus::Scoring => &[
                ApplicationStatus::EmploymentCheck,
                ApplicationStatus::Approved,
                ApplicationStatus::Rejected,
            ],
            ApplicationStatus::EmploymentCheck => {
                &[ApplicationStatus::Approved, ApplicationStatus::Rejected]
            }
            ApplicationStatus::Approved | ApplicationStatus::Rejected => &[],
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        SdkApplicationStatus::from(*self).as_str()
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = origination_sdk::objects::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SdkApplicationStatus>().map(Into::into)
    }
}

impl From<ApplicationStatus> for SdkApplicationStatus {
    fn from(value: ApplicationStatus) -> Self {
        match value {
            ApplicationStatus::Draft => SdkApplicationStatus::Draft,
            ApplicationStatus::ApplicationCreated => SdkApplicationStatus::ApplicationCreated,
            ApplicationStatus::AgreementCreated => SdkApplicationStatus::AgreementCreated,
            ApplicationStatus::Scoring => SdkApplicationStatus::Scoring,
            ApplicationStatus::EmploymentCheck => SdkApplicationStatus::EmploymentCheck,
            ApplicationStatus::Approved => SdkApplicationStatus::Approved,
            ApplicationStatus::Rejected => SdkApplicationStatus::Rejected,
        }
    }
}

impl From<SdkApplicationStatus> for ApplicationStatus {
    fn from(value: SdkApplicationStatus) -> Self {
        match value {
            SdkApplicationStatus::Draft => ApplicationStatus::Draft,
            SdkApplicationStatus::ApplicationCreated => ApplicationStatus::ApplicationCreated,
            SdkApplicationStatus::AgreementCreated => ApplicationStatus::AgreementCreated,
            SdkApplicationStatus::Scoring => ApplicationStatus::Scoring,
            SdkApplicationStatus::EmploymentCheck => ApplicationStatus::EmploymentCheck,
            SdkApplicationStatus::Approved => ApplicationStatus::Approved,
            SdkApplicationStatus::Rejected => ApplicationStatus::Rejected,
        }
    }
}
