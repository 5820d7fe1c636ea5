//! Status change events.
//!
//! # Event Flow
//!
//! 1. `StatusUpdatePipeline` persists a transition and hands a
//!    `StatusChangeEvent` to the `OutboundDispatcher`
//! 2. `OutboundDispatcher` frames it with `EventCodec` and sends it to the topic,
//!    keyed by application id
//! 3. `KafkaInboundConsumer` pulls records under the consumer group and feeds
//!    them to per-partition workers
//! 4. `InboundDispatcher` decodes each record and routes it by event type to a
//!    handler, which calls back into the pipeline

pub mod codec;
pub mod handlers;
pub mod inbound;
pub mod kafka;
pub mod outbound;
pub mod types;

pub use codec::{APPLICATION_EVENT_SCHEMA, CodecError, EventCodec, WireEnvelope};
pub use handlers::{AgreementCreatedHandler, ScoringHandler};
pub use inbound::{
    DispatchOutcome, EventHandler, HandlerError, InboundDispatcher, InboundRecord,
    PartitionControl, PartitionWorkers, SkipReason, WORKER_SHUTDOWN_GRACE,
};
pub use kafka::{KafkaInboundConsumer, KafkaTransport};
pub use outbound::{
    EventPublisher, EventTransport, MAX_SEND_RETRIES, OutboundDispatcher, PublishError,
    TransportError,
};
pub use types::{AgreementDetails, StatusChangeEvent};
