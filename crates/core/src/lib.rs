pub mod authz;
pub mod bootstrap;
pub mod event;
pub mod jsonapi;
pub mod principal;
pub mod route;
pub mod tenant;

pub use authz::{AuthzConfig, FieldPolicy, RoutePolicy};
pub use bootstrap::{
    BootstrapAuthz, BootstrapCollection, BootstrapDocument, BootstrapService, BootstrapTenant,
};
pub use event::{
    ChangeType, CollectionEntity, ConfigChange, ConfigEvent, EventDecodeError, EventPayload,
    ServiceEntity,
};
pub use jsonapi::{
    JsonApiDocument, PrimaryData, Relationship, RelationshipData, ResourceIdentifier,
    ResourceObject,
};
pub use principal::Principal;
pub use route::{RateLimitPolicy, RouteDefinition, RouteValidationError};
pub use tenant::TenantContext;
