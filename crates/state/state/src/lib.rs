pub mod error;
pub mod key;
pub mod store;
pub mod testing;

pub use error::CacheError;
pub use key::{jsonapi_key, rate_limit_key};
pub use store::CacheStore;
