use std::sync::Arc;
use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use portico_core::ConfigEvent;

use crate::config::BusConfig;
use crate::dispatch::Dispatcher;
use crate::error::BusError;
use crate::health::BusHealth;

/// The configuration bus consumer: one loop per topic, all feeding the same
/// dispatch map.
///
/// Messages within a partition are handled strictly in order: the handler
/// is awaited before the next poll, so a DELETE can never overtake the
/// CREATE that preceded it on the same partition.
pub struct BusConsumer {
    config: BusConfig,
    dispatcher: Arc<Dispatcher>,
    health: Arc<BusHealth>,
    shutdown: CancellationToken,
}

impl BusConsumer {
    #[must_use]
    pub fn new(config: BusConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            health: BusHealth::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Liveness handle for the health endpoint.
    #[must_use]
    pub fn health(&self) -> Arc<BusHealth> {
        Arc::clone(&self.health)
    }

    /// Token that stops every consumer loop when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn build_consumer(&self, topic: &str) -> Result<StreamConsumer, BusError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set("group.id", &self.config.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .set(
                "session.timeout.ms",
                self.config.session_timeout_ms.to_string(),
            )
            .create()?;

        consumer
            .subscribe(&[topic])
            .map_err(|source| BusError::Subscribe {
                topic: topic.to_owned(),
                source,
            })?;

        Ok(consumer)
    }

    /// Spawn one consumer loop per topic. Returns the join handles so the
    /// caller can await the drain during shutdown.
    pub fn spawn(&self) -> Result<Vec<JoinHandle<()>>, BusError> {
        let topics: Vec<String> = self
            .config
            .topics
            .all()
            .iter()
            .map(|t| (*t).to_owned())
            .collect();

        let mut handles = Vec::with_capacity(topics.len());
        for topic in topics {
            let consumer = self.build_consumer(&topic)?;
            let dispatcher = Arc::clone(&self.dispatcher);
            let health = Arc::clone(&self.health);
            let token = self.shutdown.clone();

            handles.push(tokio::spawn(async move {
                run_topic_loop(&topic, &consumer, &dispatcher, &health, token).await;
            }));
        }

        self.health.set_running(true);
        info!(
            brokers = %self.config.brokers,
            group = %self.config.group_id,
            "configuration bus consumer started"
        );
        Ok(handles)
    }
}

/// Poll one topic until shutdown. Each message is fully handled before the
/// next poll; cancellation is only observed between messages, which gives
/// the drain-on-shutdown guarantee for free.
async fn run_topic_loop(
    topic: &str,
    consumer: &StreamConsumer,
    dispatcher: &Dispatcher,
    health: &BusHealth,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = token.cancelled() => {
                info!(topic, "bus consumer shutting down");
                health.set_running(false);
                return;
            }
            msg = consumer.recv() => msg,
        };

        match message {
            Ok(msg) => {
                let Some(payload) = msg.payload() else {
                    warn!(topic, "skipping message with empty payload");
                    continue;
                };
                process_message(topic, payload, dispatcher, health).await;
            }
            Err(e) => {
                // Broker hiccups are retried after a pause; routing keeps
                // serving from last-known configuration either way.
                warn!(topic, error = %e, "bus poll failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn process_message(
    topic: &str,
    payload: &[u8],
    dispatcher: &Dispatcher,
    health: &BusHealth,
) {
    health.record_event();
    match ConfigEvent::decode(payload) {
        Ok(event) => dispatcher.dispatch(event).await,
        Err(e) => {
            warn!(topic, error = %e, "skipping malformed configuration event");
        }
    }
}
