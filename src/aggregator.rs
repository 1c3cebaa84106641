use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Connection settings for [`AggregatorSink`].
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    pub host: String,
    pub port: u16,
}

/// Every forwarded event carries this tag.
pub const AGGREGATOR_TAG: &str = "logs";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const RECONNECT_INTERVAL: Duration = Duration::from_secs(600);

struct ConnState {
    stream: Option<TcpStream>,
    last_failure: Option<Instant>,
}

/// Client for a remote log aggregator.
///
/// Connects with a 3 second timeout; after any transport failure the
/// next connection attempt is suppressed for 10 minutes, so a dead
/// aggregator costs each record one fast error instead of a hang.
/// Records are forwarded as newline-delimited JSON events
/// `["logs", <unix seconds>, <record>]` under the fixed tag.
pub struct AggregatorSink {
    config: AggregatorConfig,
    state: Mutex<ConnState>,
}

impl AggregatorSink {
    pub fn new(config: AggregatorConfig) -> Self {
        AggregatorSink {
            config,
            state: Mutex::new(ConnState {
                stream: None,
                last_failure: None,
            }),
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Open the forward connection if it is not already up, honoring the
    /// reconnect backoff.
    pub async fn ensure_connected(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await
    }

    async fn connect_locked(&self, state: &mut ConnState) -> Result<(), SinkError> {
        if state.stream.is_some() {
            return Ok(());
        }
        if let Some(failed_at) = state.last_failure {
            let since = failed_at.elapsed();
            if since < RECONNECT_INTERVAL {
                return Err(SinkError::ReconnectBackoff {
                    remaining_secs: (RECONNECT_INTERVAL - since).as_secs(),
                });
            }
        }

        let addr = self.addr();
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                state.stream = Some(stream);
                state.last_failure = None;
                Ok(())
            }
            Ok(Err(e)) => {
                state.last_failure = Some(Instant::now());
                Err(e.into())
            }
            Err(_) => {
                state.last_failure = Some(Instant::now());
                Err(SinkError::ConnectTimeout {
                    addr,
                    seconds: CONNECT_TIMEOUT.as_secs(),
                })
            }
        }
    }

    fn encode(record: &LogRecord) -> Result<Vec<u8>, SinkError> {
        let event = (AGGREGATOR_TAG, chrono::Utc::now().timestamp(), record);
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        Ok(line)
    }
}

#[async_trait]
impl LogSink for AggregatorSink {
    async fn connect(&self) -> Result<(), SinkError> {
        self.ensure_connected().await
    }

    async fn emit(&self, _category: &str, record: &LogRecord) -> Result<(), SinkError> {
        let line = Self::encode(record)?;

        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await?;

        let stream = state.stream.as_mut().expect("connection open after connect");
        if let Err(e) = stream.write_all(&line).await {
            state.stream = None;
            state.last_failure = Some(Instant::now());
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn forwards_tagged_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let sink = AggregatorSink::new(AggregatorConfig {
            host: "127.0.0.1".to_string(),
            port,
        });
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let record = LogRecord::application("error", "aggregator test");
        sink.emit("application", &record).await.unwrap();

        let server = accept.await.unwrap();
        let mut line = String::new();
        BufReader::new(server).read_line(&mut line).await.unwrap();

        let event: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(event[0], AGGREGATOR_TAG);
        assert!(event[1].is_i64());
        assert_eq!(event[2]["message"], "aggregator test");
        assert_eq!(event[2]["severity"], "ERROR");
    }

    #[tokio::test]
    async fn failure_arms_the_reconnect_backoff() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let sink = AggregatorSink::new(AggregatorConfig {
            host: "127.0.0.1".to_string(),
            port,
        });
        let record = LogRecord::application("info", "dead aggregator");

        // First attempt hits the wire and fails.
        let first = sink.emit("application", &record).await;
        assert!(matches!(
            first,
            Err(SinkError::Io(_)) | Err(SinkError::ConnectTimeout { .. })
        ));

        // Second attempt is short-circuited by the backoff.
        let second = sink.emit("application", &record).await;
        assert!(matches!(second, Err(SinkError::ReconnectBackoff { .. })));
    }
}
