//! Status change event as it travels over the wire.
//!
//! Identifiers and monetary values are carried as text so the Avro record
//! stays language neutral and no decimal precision is lost.

use crate::entities::CreditApplication;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Announces that an application entered a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub message_id: String,
    /// Status tag, e.g. `"SCORING"`.
    pub event_type: String,
    pub application_id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub agreement_details: AgreementDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementDetails {
    pub application_id: String,
    pub client_id: String,
    pub disbursement_amount: String,
    pub origination_amount: String,
    pub to_bank_account_id: String,
    pub term: i32,
    pub interest: String,
    pub product_code: String,
    pub product_version: String,
    /// Unix timestamp in milliseconds, unknown until the agreement is signed.
    pub payment_date: Option<i64>,
}

impl StatusChangeEvent {
    /// Snapshot the application's current status and terms into a fresh event.
    pub fn from_application(application: &CreditApplication) -> Self {
        let application_id = application.id.to_string();
        Self {
            message_id: Uuid::new_v4().to_string(),
            event_type: application.status.as_str().to_string(),
            application_id: application_id.clone(),
            timestamp: unix_millis(application.updated_at),
            agreement_details: AgreementDetails {
                application_id,
                client_id: application.user_id.to_string(),
                disbursement_amount: application.disbursement_amount.to_string(),
                origination_amount: application.origination_amount.to_string(),
                to_bank_account_id: application.to_bank_account_id.to_string(),
                term: application.term,
                interest: application.interest.to_string(),
                product_code: application.product_code.clone(),
                product_version: application.product_version.clone(),
                payment_date: None,
            },
        }
    }
}

fn unix_millis(at: time::OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}
