//! Fixtures and test doubles shared by the unit tests.

use crate::clients::{RegistryError, SchemaRegistry};
use crate::entities::{ApplicationTerms, CreditApplication, NewCreditApplication};
use crate::events::{
    EventPublisher, EventTransport, PublishError, StatusChangeEvent, TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub fn sample_terms() -> ApplicationTerms {
    ApplicationTerms {
        to_bank_account_id: Uuid::new_v4(),
        disbursement_amount: "150000.50".parse().unwrap(),
        origination_amount: "100000.00".parse().unwrap(),
        term: 12,
        interest: "15.50".parse().unwrap(),
        product_code: "code-1".to_string(),
        product_version: "version1".to_string(),
    }
}

pub fn sample_application() -> CreditApplication {
    NewCreditApplication {
        user_id: Uuid::new_v4(),
        terms: sample_terms(),
    }
    .validate()
    .unwrap()
}

pub fn sample_event() -> StatusChangeEvent {
    StatusChangeEvent::from_application(&sample_application())
}

/// Registry that hands out one fixed id, or always fails.
pub struct FixedSchemaRegistry {
    id: Option<u32>,
}

impl FixedSchemaRegistry {
    pub fn new(id: u32) -> Self {
        Self { id: Some(id) }
    }

    pub fn failing() -> Self {
        Self { id: None }
    }
}

#[async_trait]
impl SchemaRegistry for FixedSchemaRegistry {
    async fn resolve_schema_id(&self, _subject: &str, _schema: &str) -> Result<u32, RegistryError> {
        self.id.ok_or(RegistryError::MissingId)
    }
}

#[derive(Debug, Clone)]
pub struct SentRecord {
    pub topic: String,
    pub key: String,
    pub payload: Bytes,
}

/// Transport that keeps every delivered record, optionally failing the first
/// few sends.
#[derive(Default)]
pub struct RecordingTransport {
    fail_first: u32,
    attempts: AtomicU32,
    sent: Mutex<Vec<SentRecord>>,
}

impl RecordingTransport {
    pub fn failing_first(fail_first: u32) -> Self {
        Self {
            fail_first,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for RecordingTransport {
    async fn send(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(TransportError::Unavailable("broker down".to_string()));
        }
        self.sent.lock().unwrap().push(SentRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Publisher that records events instead of sending them.
#[derive(Default)]
pub struct RecordingPublisher {
    delay: Option<Duration>,
    fail: bool,
    events: Mutex<Vec<StatusChangeEvent>>,
}

impl RecordingPublisher {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<StatusChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event_type).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &StatusChangeEvent) -> Result<(), PublishError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PublishError::Exhausted {
                attempts: 6,
                source: TransportError::Unavailable("broker down".to_string()),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
