use url::Url;

#[derive(Debug, Clone)]
pub struct SchemaRegistryConfig {
    /// Base URL of the registry, e.g. `http://localhost:8081/`.
    pub url: Url,
}
