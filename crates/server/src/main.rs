use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use portico_bus::BusConsumer;
use portico_bus::Dispatcher;
use portico_core::RouteDefinition;
use portico_core::event::{AUTHZ_CHANGED, COLLECTION_CHANGED, SERVICE_CHANGED};
use portico_gateway::{
    AuthzCache, ConfigEventApplier, GatewayCore, GatewayMetrics, GatewayServices, JwksVerifier,
    RouteRegistry, TenantSlugCache,
};
use portico_server::app::{AppState, router};
use portico_server::bootstrap::{self, BootstrapClient};
use portico_server::config::{CacheBackend, PorticoConfig};
use portico_server::health::HealthState;
use portico_server::telemetry;
use portico_state::CacheStore;
use portico_state_memory::MemoryCacheStore;
use portico_state_redis::RedisCacheStore;

/// Portico gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "portico-server", about = "Single ingress for the platform")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "portico.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let cli = Cli::parse();

    // Load configuration from the TOML file, or use defaults if the file
    // does not exist.
    let config: PorticoConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    // Shared cache backend.
    let store: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Redis => {
            let store = RedisCacheStore::new(&config.cache.redis_config())?;
            info!(url = %config.cache.url, "redis cache initialized");
            Arc::new(store)
        }
        CacheBackend::Memory => {
            warn!("using in-memory cache; rate limits are process-local");
            Arc::new(MemoryCacheStore::new())
        }
    };

    // Process-wide registries and caches.
    let registry = Arc::new(RouteRegistry::new());
    let authz = Arc::new(AuthzCache::new());
    let tenants = Arc::new(TenantSlugCache::new());
    let metrics = Arc::new(GatewayMetrics::default());

    let verifier = Arc::new(JwksVerifier::new(
        &config.jwt.issuer_url,
        config.jwt.effective_jwks_url(),
    )?);
    info!(issuer = %config.jwt.issuer_url, "JWT verifier initialized");

    // One-shot bootstrap. Failure here is fatal: the gateway must not
    // serve traffic with an empty registry.
    let control = Arc::new(BootstrapClient::new(config.control_plane.clone())?);
    let doc = control.fetch().await?;
    bootstrap::apply(&doc, &registry, &authz, &tenants);

    // Built-in control plane route. Hard-coded rather than bootstrap-fed:
    // the bootstrap endpoint must be reachable through the gateway before
    // any dynamic route exists.
    registry.update(RouteDefinition {
        id: "control-plane".into(),
        path: "/control/**".into(),
        backend_url: config.control_plane.url.clone(),
        collection: "control".into(),
        service_id: None,
        rate_limit: None,
    })?;

    let services = GatewayServices {
        registry: Arc::clone(&registry),
        authz: Arc::clone(&authz),
        tenants: Arc::clone(&tenants),
        store: Arc::clone(&store),
        verifier,
        metrics: Arc::clone(&metrics),
    };
    let core = Arc::new(GatewayCore::new(&services, config.gateway_config())?);

    // Stale IP rate-limit entries are evicted every 120 s.
    let _evictor = core.ip_limiter().spawn_evictor(Duration::from_secs(120));

    // Configuration bus consumer. A broker outage is not fatal: routing
    // continues on last-known configuration.
    let tenant_refresh = Arc::new(Notify::new());
    let applier: Arc<ConfigEventApplier> = Arc::new(
        ConfigEventApplier::new(Arc::clone(&registry), Arc::clone(&authz))
            .with_tenant_refresh(Arc::clone(&tenant_refresh)),
    );
    let collection_handler: Arc<dyn portico_bus::EventHandler> = Arc::clone(&applier) as Arc<dyn portico_bus::EventHandler>;
    let authz_handler: Arc<dyn portico_bus::EventHandler> = Arc::clone(&applier) as Arc<dyn portico_bus::EventHandler>;
    let service_handler: Arc<dyn portico_bus::EventHandler> = applier;
    let dispatcher = Dispatcher::new()
        .with_handler(COLLECTION_CHANGED, collection_handler)
        .with_handler(AUTHZ_CHANGED, authz_handler)
        .with_handler(SERVICE_CHANGED, service_handler);

    let consumer = BusConsumer::new(config.bus.clone(), dispatcher);
    let bus_health = consumer.health();
    let bus_shutdown = consumer.shutdown_token();
    let bus_handles = match consumer.spawn() {
        Ok(handles) => handles,
        Err(e) => {
            warn!(error = %e, "bus consumer unavailable, continuing with last-known configuration");
            Vec::new()
        }
    };

    // Tenant slug refresh: periodic, and poked by authz events.
    {
        let control = Arc::clone(&control);
        let tenants = Arc::clone(&tenants);
        let refresh_interval = Duration::from_secs(config.control_plane.slug_refresh_seconds);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(refresh_interval);
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    () = tenant_refresh.notified() => {}
                }
                match control.fetch_slug_map().await {
                    Ok(entries) => {
                        tenants.replace_all(entries.into_iter().map(|t| (t.slug, t.id)));
                    }
                    Err(e) => warn!(error = %e, "tenant slug refresh failed"),
                }
            }
        });
    }

    let state = AppState {
        core,
        health: HealthState {
            store,
            bus: Some(bus_health),
            control,
            metrics,
        },
    };
    let app = router(state, config.server.max_in_flight);

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "portico-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Drain the bus consumer: cancellation is observed between messages,
    // so any in-flight event finishes before the loop exits.
    bus_shutdown.cancel();
    let drain_deadline = Duration::from_secs(config.server.shutdown_timeout_seconds);
    for handle in bus_handles {
        if tokio::time::timeout(drain_deadline, handle).await.is_err() {
            warn!("bus consumer did not drain within the shutdown timeout");
            break;
        }
    }

    info!("portico-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
