//! Kafka adapters for the event dispatchers.

use crate::config::KafkaConfig;
use crate::events::{
    EventTransport, InboundDispatcher, InboundRecord, PartitionControl, PartitionWorkers,
    TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use compact_str::CompactString;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Producer side. Every send waits for acknowledgement from all in-sync
/// replicas.
pub struct KafkaTransport {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaTransport {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "false")
            .set("message.timeout.ms", config.send_timeout.as_millis().to_string())
            .create()?;

        info!(brokers = %config.brokers, acks = "all", "KafkaTransport created");

        Ok(Self {
            producer,
            timeout: config.send_timeout,
        })
    }
}

#[async_trait]
impl EventTransport for KafkaTransport {
    async fn send(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), TransportError> {
        let record = FutureRecord::to(topic).key(key).payload(payload.as_ref());

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => {
                debug!(topic = %topic, key = %key, partition, offset, "Record delivered");
                Ok(())
            }
            Err((kafka_error, _)) => Err(TransportError::Kafka(kafka_error)),
        }
    }
}

/// Consumer side: pulls records for the configured group and hands them to
/// per-partition workers. Offsets are committed manually after dispatch, and
/// a partition whose worker falls behind is paused on the consumer.
pub struct KafkaInboundConsumer {
    consumer: Arc<StreamConsumer>,
    topic: CompactString,
    partition_buffer: usize,
}

impl KafkaInboundConsumer {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", config.consumer_group.as_str())
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", config.auto_offset_reset.as_str())
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            group = %config.consumer_group,
            "KafkaInboundConsumer subscribed"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.topic.clone(),
            partition_buffer: config.partition_buffer,
        })
    }

    /// Consume until shutdown is signaled, then give every partition worker up
    /// to [`WORKER_SHUTDOWN_GRACE`](crate::events::WORKER_SHUTDOWN_GRACE) to
    /// finish the record in flight.
    pub async fn run(self, dispatcher: Arc<InboundDispatcher>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(topic = %self.topic, "KafkaInboundConsumer started");

        let control = Arc::new(ConsumerControl {
            consumer: self.consumer.clone(),
            topic: self.topic.clone(),
        });
        let mut workers = PartitionWorkers::new(
            dispatcher,
            control,
            shutdown_rx.clone(),
            self.partition_buffer,
        );

        let mut stream = self.consumer.stream();
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("KafkaInboundConsumer received shutdown signal");
                        break;
                    }
                }

                message = stream.next() => {
                    match message {
                        Some(Ok(message)) => {
                            let record = InboundRecord {
                                partition: message.partition(),
                                offset: message.offset(),
                                payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                            };
                            drop(message);
                            workers.route(record);
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Failed to receive record");
                        }
                        None => {
                            info!("Consumer stream ended");
                            break;
                        }
                    }
                }
            }
        }

        drop(stream);
        workers.shutdown().await;
        info!("KafkaInboundConsumer shutdown complete");
    }
}

/// Commits and flow control for one topic on the shared consumer.
struct ConsumerControl {
    consumer: Arc<StreamConsumer>,
    topic: CompactString,
}

impl ConsumerControl {
    fn partition_list(&self, partition: i32) -> TopicPartitionList {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition(&self.topic, partition);
        tpl
    }
}

impl PartitionControl for ConsumerControl {
    fn commit(&self, partition: i32, offset: i64) {
        let topic = self.topic.as_str();
        let mut tpl = TopicPartitionList::new();
        if let Err(e) = tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1)) {
            warn!(topic = %topic, partition, offset, error = %e, "Invalid commit position");
            return;
        }
        if let Err(e) = self.consumer.commit(&tpl, CommitMode::Async) {
            warn!(
                topic = %topic,
                partition,
                offset,
                error = %e,
                "Failed to commit offset (record may be redelivered)"
            );
        }
    }

    fn pause(&self, partition: i32) {
        if let Err(e) = self.consumer.pause(&self.partition_list(partition)) {
            warn!(topic = %self.topic, partition, error = %e, "Failed to pause partition");
        }
    }

    fn resume(&self, partition: i32) {
        if let Err(e) = self.consumer.resume(&self.partition_list(partition)) {
            warn!(topic = %self.topic, partition, error = %e, "Failed to resume partition");
        }
    }
}
