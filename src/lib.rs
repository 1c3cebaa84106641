pub mod record;
pub mod sink;
pub mod timing;

pub mod bus;
pub mod aggregator;
pub mod collector;
pub mod memory_sink;
pub mod noop_sink;

pub mod console;
pub mod rolling;
pub mod router;

pub mod correlator;

pub mod env;
pub mod init;

pub use aggregator::AggregatorConfig;
pub use collector::CollectorConfig;
pub use correlator::{request_correlator, CorrelatorLayer};
pub use init::{
    configure_aggregator, configure_collector, configure_from_env, configure_message_bus,
    log_application,
};
pub use record::{LogRecord, RecordClass};
pub use router::{Category, EmissionRouter, RouterConfig, RunMode};
pub use sink::{LogSink, SinkError};
