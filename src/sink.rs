use crate::record::LogRecord;
use async_trait::async_trait;

/// Error raised by a sink while delivering a record.
///
/// These never reach the request path: the emission worker logs them
/// locally and drops the record (at-most-once delivery, no retries).
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("i/o failure talking to the collector: {0}")]
    Io(#[from] std::io::Error),

    #[error("connecting to {addr} timed out after {seconds}s")]
    ConnectTimeout { addr: String, seconds: u64 },

    #[error("collector unreachable, reconnect suppressed for {remaining_secs}s")]
    ReconnectBackoff { remaining_secs: u64 },

    #[error("record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Asynchronous destination for [`LogRecord`]s produced by the emission
/// router.
///
/// Implementations transport records to a concrete collector (message
/// bus, remote aggregator, nothing at all). The router calls `emit` from
/// its background worker and never awaits it on the request path.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single record under the given category
    /// (`"application"`, `"request"` or `"response"`).
    ///
    /// **Returns**
    /// - `Ok(())` if the collector accepted the record.
    /// - `Err(..)` on transport or serialization failure. The router
    ///   treats this as final for the record: it is logged and dropped.
    async fn emit(&self, category: &str, record: &LogRecord) -> Result<(), SinkError>;

    /// Open the transport ahead of the first `emit`, where the backend
    /// has one to open. Called once when the collector is configured.
    ///
    /// Default implementation is a no-op.
    async fn connect(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Flush any buffered records, if the backend buffers.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
