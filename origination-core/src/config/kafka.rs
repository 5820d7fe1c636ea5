use compact_str::CompactString;
use std::time::Duration;

/// Broker connection and topic settings for both the producer and the
/// consumer group.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Comma-separated `host:port` list.
    pub brokers: String,
    /// Topic carrying status change events.
    pub topic: CompactString,
    pub consumer_group: CompactString,
    /// Upper bound for a single delivery attempt.
    pub send_timeout: Duration,
    /// Records buffered per partition worker before intake blocks.
    pub partition_buffer: usize,
    /// `earliest` or `latest`, used when the group has no committed offset.
    pub auto_offset_reset: CompactString,
}
