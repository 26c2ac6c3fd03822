use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authz::AuthzConfig;
use crate::route::RateLimitPolicy;

/// Event types carried on the configuration bus.
pub const COLLECTION_CHANGED: &str = "config.collection.changed";
pub const AUTHZ_CHANGED: &str = "config.authz.changed";
pub const SERVICE_CHANGED: &str = "config.service.changed";

/// What happened to the entity in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

/// Payload of a configuration event: the change kind plus the entity as it
/// exists after the change (or its identity, for deletions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub change_type: ChangeType,
    pub entity: serde_json::Value,
}

/// The envelope every configuration event arrives in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEvent {
    pub event_id: String,
    pub event_type: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

/// A malformed or unrecognized configuration event.
///
/// Decode failures are logged and skipped by the consumer; they never stop
/// the stream.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("invalid event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("unknown event type '{0}'")]
    UnknownType(String),

    #[error("invalid {entity} entity in '{event_type}' event: {source}")]
    Entity {
        event_type: String,
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Collection entity carried by `config.collection.changed`.
///
/// A collection projects to exactly one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
}

/// Service entity carried by `config.service.changed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A configuration event decoded into its typed form.
#[derive(Debug, Clone)]
pub enum ConfigChange {
    Collection {
        change: ChangeType,
        collection: CollectionEntity,
    },
    Authz {
        change: ChangeType,
        authz: AuthzConfig,
    },
    Service {
        change: ChangeType,
        service: ServiceEntity,
    },
}

impl ConfigEvent {
    /// Decode an event from its wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, EventDecodeError> {
        serde_json::from_slice(bytes).map_err(EventDecodeError::Envelope)
    }

    /// Classify the event by type and parse its entity.
    pub fn change(&self) -> Result<ConfigChange, EventDecodeError> {
        let entity = |name: &'static str, err: serde_json::Error| EventDecodeError::Entity {
            event_type: self.event_type.clone(),
            entity: name,
            source: err,
        };

        match self.event_type.as_str() {
            COLLECTION_CHANGED => {
                let collection = serde_json::from_value(self.payload.entity.clone())
                    .map_err(|e| entity("collection", e))?;
                Ok(ConfigChange::Collection {
                    change: self.payload.change_type,
                    collection,
                })
            }
            AUTHZ_CHANGED => {
                let authz = serde_json::from_value(self.payload.entity.clone())
                    .map_err(|e| entity("authz", e))?;
                Ok(ConfigChange::Authz {
                    change: self.payload.change_type,
                    authz,
                })
            }
            SERVICE_CHANGED => {
                let service = serde_json::from_value(self.payload.entity.clone())
                    .map_err(|e| entity("service", e))?;
                Ok(ConfigChange::Service {
                    change: self.payload.change_type,
                    service,
                })
            }
            other => Err(EventDecodeError::UnknownType(other.to_owned())),
        }
    }
}
