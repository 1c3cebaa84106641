use crate::aggregator::AggregatorConfig;
use crate::collector::CollectorConfig;
use crate::env;
use crate::record::LogRecord;
use crate::router::{Category, EmissionRouter, RouterConfig};
use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex};

static ROUTER: ArcSwapOption<EmissionRouter> = ArcSwapOption::const_empty();
static INSTALL: Mutex<()> = Mutex::new(());

/// Route application logs and request pairs to a message-bus publisher
/// at `addr`.
///
/// Mutually exclusive with [`configure_aggregator`]; the last call wins.
/// Must be called within a Tokio runtime.
pub fn configure_message_bus(addr: impl Into<String>) {
    configure_collector(CollectorConfig::MessageBus { addr: addr.into() });
}

/// Route application logs and request pairs to a remote log aggregator.
///
/// Mutually exclusive with [`configure_message_bus`]; the last call
/// wins. Must be called within a Tokio runtime.
pub fn configure_aggregator(config: AggregatorConfig) {
    configure_collector(CollectorConfig::Aggregator(config));
}

/// Install the process-wide emission router for the given collector,
/// replacing any previous selection.
pub fn configure_collector(config: CollectorConfig) {
    if tokio::runtime::Handle::try_current().is_err() {
        tracing::error!("collector configuration requires a running Tokio runtime, ignoring");
        return;
    }

    let sink = config.make_sink();

    // Warm the transport up in the background; a failure here only
    // costs the first emits their lazy reconnect.
    let warm = Arc::clone(&sink);
    tokio::spawn(async move {
        if let Err(e) = warm.connect().await {
            tracing::warn!(error = %e, "collector connection warm-up failed");
        }
    });

    let router = EmissionRouter::new(RouterConfig {
        mode: env::run_mode_from_env(),
        sink: Some(sink),
        ..RouterConfig::default()
    });
    ROUTER.store(Some(Arc::new(router)));
}

/// Configure a collector described by the environment, if any.
///
/// [`crate::env::BUS_ADDR_ENV`] takes precedence over the aggregator
/// host/port pair; with neither present nothing changes.
pub fn configure_from_env() {
    let bus = env::env_or(env::BUS_ADDR_ENV, "");
    if !bus.is_empty() {
        configure_message_bus(bus);
        return;
    }

    let host = env::env_or(env::AGGREGATOR_HOST_ENV, "");
    let port = env::env_or(env::AGGREGATOR_PORT_ENV, "").parse::<u16>();
    if let (false, Ok(port)) = (host.is_empty(), port) {
        configure_aggregator(AggregatorConfig { host, port });
    }
}

/// Log an ad-hoc application message at the given level.
///
/// The message is flattened to one line, truncated for storage and
/// routed like every other record; error-level messages keep their full
/// text in `trace`. Never panics, regardless of input.
pub fn log_application(level: &str, message: &str) {
    let Some(router) = current_router() else {
        return;
    };
    router.route(Category::Application, LogRecord::application(level, message));
}

/// The process-wide router, creating a sink-less default on first use.
///
/// Outside a Tokio runtime no router can be built and `None` is
/// returned; emission is silently skipped rather than failing the
/// caller.
pub(crate) fn current_router() -> Option<Arc<EmissionRouter>> {
    if let Some(router) = ROUTER.load_full() {
        return Some(router);
    }
    if tokio::runtime::Handle::try_current().is_err() {
        return None;
    }

    let _guard = INSTALL.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(router) = ROUTER.load_full() {
        return Some(router);
    }
    let router = Arc::new(EmissionRouter::new(RouterConfig {
        mode: env::run_mode_from_env(),
        ..RouterConfig::default()
    }));
    ROUTER.store(Some(Arc::clone(&router)));
    Some(router)
}
