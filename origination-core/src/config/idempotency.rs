use std::time::Duration;

/// Sizing of the idempotency-key cache.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            capacity: crate::idempotency::DEFAULT_CAPACITY,
            ttl: crate::idempotency::DEFAULT_TTL,
        }
    }
}
