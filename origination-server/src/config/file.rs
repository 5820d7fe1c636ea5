//! TOML file configuration structures.
//!
//! These structs directly map to the `origination-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub kafka: KafkaConfig,
    pub schema_registry: SchemaRegistryConfig,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_db_connections: u32,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_connections() -> u32 {
    10
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Kafka configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_partition_buffer")]
    pub partition_buffer: usize,
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
}

fn default_topic() -> String {
    "credit-application-status".to_string()
}

fn default_consumer_group() -> String {
    "credit-origination".to_string()
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_partition_buffer() -> usize {
    64
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

/// Schema registry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegistryConfig {
    pub url: Url,
}

/// Idempotency-key cache section. Optional; defaults to 10,000 entries kept
/// for 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    #[serde(default = "default_idempotency_capacity")]
    pub capacity: usize,
    #[serde(default = "default_idempotency_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            capacity: default_idempotency_capacity(),
            ttl_secs: default_idempotency_ttl_secs(),
        }
    }
}

fn default_idempotency_capacity() -> usize {
    origination_core::idempotency::DEFAULT_CAPACITY
}

fn default_idempotency_ttl_secs() -> u64 {
    origination_core::idempotency::DEFAULT_TTL.as_secs()
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "test-secret"

[kafka]
brokers = "localhost:9092"
topic = "applications"

[schema_registry]
url = "http://localhost:8081/"
"#;

    #[test]
    fn test_default_config_parsing() {
        let config: FileConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.max_db_connections, 10);
        assert_eq!(config.kafka.topic, "applications");
        assert_eq!(config.kafka.consumer_group, "credit-origination");
        assert_eq!(config.kafka.auto_offset_reset, "earliest");
        assert_eq!(config.schema_registry.url.as_str(), "http://localhost:8081/");
        assert_eq!(config.idempotency.capacity, 10_000);
        assert_eq!(config.idempotency.ttl_secs, 86_400);
        assert!(!config.is_admin_secret_hashed());
    }

    #[test]
    fn test_hashed_secret_detection() {
        let mut config: FileConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        config.admin.secret = "$argon2id$v=19$m=19456,t=2,p=1$abc123".to_string();
        assert!(config.is_admin_secret_hashed());
    }

    #[test]
    fn test_missing_kafka_section_is_an_error() {
        let toml_str = r#"
[server]
[admin]
secret = "s"
[schema_registry]
url = "http://localhost:8081/"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
