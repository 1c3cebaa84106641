use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Publish-only message-bus sink.
///
/// Each record goes out as one two-frame message, category frame first,
/// serialized record second, both length-prefixed (u32 big-endian). The
/// connection is opened on first use and re-established on demand after
/// a write failure; subscribers joining late simply miss earlier
/// messages.
pub struct MessageBusSink {
    addr: String,
    conn: Mutex<Option<TcpStream>>,
}

impl MessageBusSink {
    /// Create a sink publishing to `addr` (`"host:port"`). No I/O
    /// happens here; call [`MessageBusSink::ensure_connected`] to warm
    /// the connection up front.
    pub fn new(addr: impl Into<String>) -> Self {
        MessageBusSink {
            addr: addr.into(),
            conn: Mutex::new(None),
        }
    }

    /// Open the publish connection if it is not already up.
    pub async fn ensure_connected(&self) -> Result<(), SinkError> {
        let mut conn = self.conn.lock().await;
        if conn.is_none() {
            *conn = Some(TcpStream::connect(&self.addr).await?);
        }
        Ok(())
    }

    fn encode(category: &str, record: &LogRecord) -> Result<Vec<u8>, SinkError> {
        let payload = serde_json::to_vec(record)?;
        let mut frame = Vec::with_capacity(8 + category.len() + payload.len());
        frame.extend_from_slice(&(category.len() as u32).to_be_bytes());
        frame.extend_from_slice(category.as_bytes());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}

#[async_trait]
impl LogSink for MessageBusSink {
    async fn connect(&self) -> Result<(), SinkError> {
        self.ensure_connected().await
    }

    async fn emit(&self, category: &str, record: &LogRecord) -> Result<(), SinkError> {
        let frame = Self::encode(category, record)?;

        let mut conn = self.conn.lock().await;
        if conn.is_none() {
            *conn = Some(TcpStream::connect(&self.addr).await?);
        }
        let stream = conn.as_mut().expect("connection just opened");

        // One write per message keeps concurrent emissions whole on the wire.
        if let Err(e) = stream.write_all(&frame).await {
            *conn = None;
            return Err(e.into());
        }
        Ok(())
    }
}
