use serde::Deserialize;

/// Topic names for the three configuration streams.
#[derive(Debug, Clone, Deserialize)]
pub struct BusTopics {
    #[serde(default = "default_collection_topic")]
    pub collection_changed: String,
    #[serde(default = "default_authz_topic")]
    pub authz_changed: String,
    #[serde(default = "default_service_topic")]
    pub service_changed: String,
}

impl Default for BusTopics {
    fn default() -> Self {
        Self {
            collection_changed: default_collection_topic(),
            authz_changed: default_authz_topic(),
            service_changed: default_service_topic(),
        }
    }
}

impl BusTopics {
    /// All topic names, for subscription and health reporting.
    #[must_use]
    pub fn all(&self) -> [&str; 3] {
        [
            &self.collection_changed,
            &self.authz_changed,
            &self.service_changed,
        ]
    }
}

fn default_collection_topic() -> String {
    "config.collection.changed".to_owned()
}

fn default_authz_topic() -> String {
    "config.authz.changed".to_owned()
}

fn default_service_topic() -> String {
    "config.service.changed".to_owned()
}

/// Kafka consumer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Kafka bootstrap servers, comma-separated.
    #[serde(default = "default_brokers")]
    pub brokers: String,

    /// Consumer group id. Every gateway instance uses its own group so each
    /// sees the full configuration stream.
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Topic names.
    #[serde(default)]
    pub topics: BusTopics,

    /// Kafka session timeout in milliseconds.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            group_id: default_group_id(),
            topics: BusTopics::default(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

fn default_brokers() -> String {
    "127.0.0.1:9092".to_owned()
}

fn default_group_id() -> String {
    "portico-gateway".to_owned()
}

fn default_session_timeout_ms() -> u64 {
    6000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.brokers, "127.0.0.1:9092");
        assert_eq!(cfg.topics.collection_changed, "config.collection.changed");
        assert_eq!(cfg.topics.all().len(), 3);
    }

    #[test]
    fn deserializes_from_toml_fragment() {
        let cfg: BusConfig = toml::from_str(
            r#"
            brokers = "kafka-1:9092,kafka-2:9092"
            group_id = "gw-7"

            [topics]
            collection_changed = "cfg.collections"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(cfg.topics.collection_changed, "cfg.collections");
        assert_eq!(cfg.topics.authz_changed, "config.authz.changed");
    }
}
