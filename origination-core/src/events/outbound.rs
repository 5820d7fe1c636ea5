//! Publishing status change events.
//!
//! The dispatcher resolves the schema id for its topic once, at construction,
//! and then frames every event with it. Records are keyed by application id so
//! all events of one application land on the same partition.

use crate::clients::{RegistryError, SchemaRegistry};
use crate::events::{CodecError, EventCodec, StatusChangeEvent};
use async_trait::async_trait;
use bytes::Bytes;
use compact_str::CompactString;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Sends after the first attempt before giving up.
pub const MAX_SEND_RETRIES: u32 = 5;

const BASE_RETRY_DELAY_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Byte-level record delivery to a topic.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn send(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to resolve schema id: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Anything that can announce a status change.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &StatusChangeEvent) -> Result<(), PublishError>;
}

pub struct OutboundDispatcher {
    transport: Arc<dyn EventTransport>,
    codec: EventCodec,
    topic: CompactString,
    schema_id: u32,
}

impl OutboundDispatcher {
    /// Resolve the schema id for `topic` and build a dispatcher bound to it.
    ///
    /// The topic name is used as the registry subject.
    pub async fn connect(
        registry: &dyn SchemaRegistry,
        transport: Arc<dyn EventTransport>,
        codec: EventCodec,
        topic: impl Into<CompactString>,
    ) -> Result<Self, PublishError> {
        let topic = topic.into();
        let schema_id = registry
            .resolve_schema_id(&topic, codec.schema_text())
            .await?;
        info!(topic = %topic, schema_id, "OutboundDispatcher ready");
        Ok(Self {
            transport,
            codec,
            topic,
            schema_id,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }
}

#[async_trait]
impl EventPublisher for OutboundDispatcher {
    async fn publish(&self, event: &StatusChangeEvent) -> Result<(), PublishError> {
        let payload = self.codec.encode(self.schema_id, event)?;
        let key = event.application_id.as_str();

        let mut retry = 0;
        loop {
            match self.transport.send(&self.topic, key, payload.clone()).await {
                Ok(()) => {
                    info!(
                        topic = %self.topic,
                        key = %key,
                        event_type = %event.event_type,
                        message_id = %event.message_id,
                        "Published status change event"
                    );
                    return Ok(());
                }
                Err(e) if retry < MAX_SEND_RETRIES => {
                    let delay = calculate_retry_delay(retry);
                    warn!(
                        topic = %self.topic,
                        key = %key,
                        error = %e,
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    return Err(PublishError::Exhausted {
                        attempts: retry + 1,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Delay before the retry numbered `retry_count` (starting at 0).
///
/// Uses exponential backoff: 100ms * 2^retry_count.
pub fn calculate_retry_delay(retry_count: u32) -> Duration {
    Duration::from_millis(BASE_RETRY_DELAY_MS << retry_count.min(MAX_SEND_RETRIES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedSchemaRegistry, RecordingTransport, sample_event};

    async fn dispatcher(transport: Arc<RecordingTransport>) -> OutboundDispatcher {
        OutboundDispatcher::connect(
            &FixedSchemaRegistry::new(17),
            transport,
            EventCodec::with_default_schema().unwrap(),
            "application",
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_retry_delay_calculation() {
        assert_eq!(calculate_retry_delay(0), Duration::from_millis(100));
        assert_eq!(calculate_retry_delay(1), Duration::from_millis(200));
        assert_eq!(calculate_retry_delay(4), Duration::from_millis(1600));
        assert_eq!(calculate_retry_delay(5), Duration::from_millis(3200));
        assert_eq!(calculate_retry_delay(50), Duration::from_millis(3200));
    }

    #[tokio::test]
    async fn test_connect_fails_when_registry_fails() {
        let result = OutboundDispatcher::connect(
            &FixedSchemaRegistry::failing(),
            Arc::new(RecordingTransport::default()),
            EventCodec::with_default_schema().unwrap(),
            "application",
        )
        .await;
        assert!(matches!(result, Err(PublishError::Registry(_))));
    }

    #[tokio::test]
    async fn test_publish_frames_and_keys_record() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone()).await;
        let event = sample_event();

        dispatcher.publish(&event).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "application");
        assert_eq!(sent[0].key, event.application_id);
        assert_eq!(&sent[0].payload[..5], &[0, 0, 0, 0, 17]);
        let codec = EventCodec::with_default_schema().unwrap();
        assert_eq!(codec.decode(&sent[0].payload).unwrap(), event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_retries_transient_failures() {
        let transport = Arc::new(RecordingTransport::failing_first(3));
        let dispatcher = dispatcher(transport.clone()).await;

        dispatcher.publish(&sample_event()).await.unwrap();

        assert_eq!(transport.attempts(), 4);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_gives_up_after_retry_bound() {
        let transport = Arc::new(RecordingTransport::failing_first(u32::MAX));
        let dispatcher = dispatcher(transport.clone()).await;

        let err = dispatcher.publish(&sample_event()).await.unwrap_err();

        assert!(matches!(err, PublishError::Exhausted { attempts: 6, .. }));
        assert_eq!(transport.attempts(), 6);
        assert!(transport.sent().is_empty());
    }
}
