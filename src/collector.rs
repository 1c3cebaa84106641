use std::sync::Arc;

use crate::aggregator::{AggregatorConfig, AggregatorSink};
use crate::bus::MessageBusSink;
use crate::sink::LogSink;

/// Collector selection, decided once at configuration time.
///
/// The variant picks the concrete [`LogSink`] implementation; per-record
/// emission never inspects a collector name again.
#[derive(Debug, Clone)]
pub enum CollectorConfig {
    /// Publish-only message-bus socket at `addr` (`"host:port"`).
    MessageBus { addr: String },
    /// Remote log aggregator reached at `host:port`.
    Aggregator(AggregatorConfig),
}

impl CollectorConfig {
    /// Build the concrete sink for this selection.
    ///
    /// No I/O happens here; both sinks connect lazily (or via their
    /// `ensure_connected` warm-up).
    pub fn make_sink(&self) -> Arc<dyn LogSink> {
        match self {
            CollectorConfig::MessageBus { addr } => Arc::new(MessageBusSink::new(addr.clone())),
            CollectorConfig::Aggregator(config) => Arc::new(AggregatorSink::new(config.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_variants_build_a_sink() {
        // Construction alone must not touch the network.
        let bus = CollectorConfig::MessageBus {
            addr: "127.0.0.1:1".to_string(),
        };
        let agg = CollectorConfig::Aggregator(AggregatorConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
        });
        let _ = bus.make_sink();
        let _ = agg.make_sink();
    }
}
