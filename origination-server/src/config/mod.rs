//! Configuration module for origination-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;

use crate::api::extractors::AdminSecret;
use crate::config::file::FileConfig;
use compact_str::CompactString;
use origination_core::config::{IdempotencyConfig, KafkaConfig, SchemaRegistryConfig};
use origination_core::idempotency::MAX_TTL;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub max_db_connections: u32,
    pub admin: AdminSecret,
    pub kafka: KafkaConfig,
    pub schema_registry: SchemaRegistryConfig,
    pub idempotency: IdempotencyConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = self.hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.admin.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin secret must not be empty".to_string(),
            ));
        }
        if config.kafka.brokers.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "kafka.brokers must list at least one broker".to_string(),
            ));
        }
        if config.kafka.topic.is_empty() {
            return Err(ConfigError::ValidationError(
                "kafka.topic must not be empty".to_string(),
            ));
        }
        if config.kafka.partition_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "kafka.partition_buffer must be at least 1".to_string(),
            ));
        }
        if !matches!(config.kafka.auto_offset_reset.as_str(), "earliest" | "latest") {
            return Err(ConfigError::ValidationError(format!(
                "kafka.auto_offset_reset must be \"earliest\" or \"latest\", got {:?}",
                config.kafka.auto_offset_reset
            )));
        }
        if config.idempotency.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "idempotency.capacity must be at least 1".to_string(),
            ));
        }
        let ttl_secs = config.idempotency.ttl_secs;
        if ttl_secs == 0 || ttl_secs > MAX_TTL.as_secs() {
            return Err(ConfigError::ValidationError(format!(
                "idempotency.ttl_secs must be between 1 and {}, got {ttl_secs}",
                MAX_TTL.as_secs()
            )));
        }
        Ok(())
    }

    fn hash_secret(&self, plaintext: &str) -> Result<String, ConfigError> {
        use argon2::{
            Argon2, PasswordHasher,
            password_hash::{SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConfigError::HashError(e.to_string()))
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write to a temp file, then rename over the original
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    let kafka = file_config.kafka;
    LoadedConfig {
        listen: file_config.server.listen,
        max_db_connections: file_config.server.max_db_connections,
        admin: AdminSecret::from_hash(secret_hash),
        kafka: KafkaConfig {
            brokers: kafka.brokers,
            topic: CompactString::from(kafka.topic),
            consumer_group: CompactString::from(kafka.consumer_group),
            send_timeout: Duration::from_millis(kafka.send_timeout_ms),
            partition_buffer: kafka.partition_buffer,
            auto_offset_reset: CompactString::from(kafka.auto_offset_reset),
        },
        schema_registry: SchemaRegistryConfig {
            url: file_config.schema_registry.url,
        },
        idempotency: IdempotencyConfig {
            capacity: file_config.idempotency.capacity,
            ttl: Duration::from_secs(file_config.idempotency.ttl_secs),
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "plain-secret"

[kafka]
brokers = "localhost:9092"
send_timeout_ms = 2500

[schema_registry]
url = "http://localhost:8081/"

[idempotency]
capacity = 50
ttl_secs = 60
"#;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("origination-config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_plaintext_secret_is_hashed_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, CONFIG);

        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        assert!(loaded.admin.matches("plain-secret"));

        let rewritten: FileConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rewritten.is_admin_secret_hashed());
        assert!(!path.with_extension("toml.tmp").exists());

        // Loading again keeps the same hash.
        let reloaded = ConfigLoader::new(&path, None).load().unwrap();
        assert_eq!(reloaded.admin.hash(), loaded.admin.hash());
    }

    #[test]
    fn test_runtime_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, CONFIG);
        let override_addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();

        let loaded = ConfigLoader::new(&path, Some(override_addr)).load().unwrap();
        assert_eq!(loaded.listen, override_addr);
        assert_eq!(loaded.kafka.topic, "credit-application-status");
        assert_eq!(loaded.kafka.send_timeout, Duration::from_millis(2500));
        assert_eq!(loaded.idempotency.capacity, 50);
        assert_eq!(loaded.idempotency.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_offset_reset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let content = CONFIG.replace(
            "send_timeout_ms = 2500",
            "send_timeout_ms = 2500\nauto_offset_reset = \"smallest\"",
        );
        let path = write_config(&dir, &content);

        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_idempotency_ttl_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let too_long = (MAX_TTL.as_secs() + 1).to_string();
        for ttl in ["0", too_long.as_str(), "9223372036854775807"] {
            let content = CONFIG.replace("ttl_secs = 60", &format!("ttl_secs = {ttl}"));
            let path = write_config(&dir, &content);
            assert!(
                matches!(
                    ConfigLoader::new(&path, None).load(),
                    Err(ConfigError::ValidationError(_))
                ),
                "ttl_secs = {ttl} was accepted"
            );
        }

        let content = CONFIG.replace(
            "ttl_secs = 60",
            &format!("ttl_secs = {}", MAX_TTL.as_secs()),
        );
        let path = write_config(&dir, &content);
        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        assert_eq!(loaded.idempotency.ttl, MAX_TTL);
    }
}
