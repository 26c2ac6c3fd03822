//! Kafka consumer for the configuration bus.
//!
//! The control plane publishes configuration changes on three topics
//! (collections, authorization, services). One consumer loop runs per topic;
//! decoded events are handed to registered handlers through a dispatch map
//! keyed by event type. A malformed event is logged and skipped; the
//! consumer never stops because of a single bad message. Events are
//! processed one at a time per partition, so the broker's per-partition
//! ordering is preserved end to end.

mod config;
mod consumer;
mod dispatch;
mod error;
mod health;

pub use config::{BusConfig, BusTopics};
pub use consumer::BusConsumer;
pub use dispatch::{Dispatcher, EventHandler};
pub use error::BusError;
pub use health::{BusHealth, BusHealthSnapshot};
