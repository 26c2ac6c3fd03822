use thiserror::Error;

/// Errors that can occur when starting or running the Portico server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The one-shot bootstrap fetch failed. Fatal at startup.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// The cache backend could not be constructed.
    #[error("cache error: {0}")]
    Cache(#[from] portico_state::CacheError),

    /// The bus consumer could not be started.
    #[error("bus error: {0}")]
    Bus(#[from] portico_bus::BusError),

    /// A gateway construction error.
    #[error("gateway error: {0}")]
    Gateway(#[from] portico_gateway::GatewayError),
}
