use thiserror::Error;

/// Errors from the configuration bus consumer.
#[derive(Debug, Error)]
pub enum BusError {
    /// The underlying Kafka client failed.
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Subscribing to a topic failed.
    #[error("failed to subscribe to topic '{topic}': {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },
}
