use crate::console;
use crate::record::LogRecord;
use crate::rolling::{RollingFile, DEFAULT_LOG_PATH};
use crate::sink::LogSink;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Emission strategy selector, normally read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Console + local rotating file, for a human watching the service.
    Development,
    /// Structured records forwarded to the configured collector.
    Production,
}

/// Category a record is routed under, fixed per emission site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Application,
    Request,
    Response,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Application => "application",
            Category::Request => "request",
            Category::Response => "response",
        }
    }
}

/// Configuration injected into [`EmissionRouter::new`].
///
/// The process-wide facade in [`crate::init`] builds one of these from
/// the environment and the configured collector; tests construct their
/// own with a [`crate::memory_sink::MemorySink`] or a temporary log
/// path.
pub struct RouterConfig {
    pub mode: RunMode,
    pub sink: Option<Arc<dyn LogSink>>,
    pub log_path: PathBuf,
    pub channel_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            mode: RunMode::Production,
            sink: None,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            channel_capacity: 1024,
        }
    }
}

enum Envelope {
    Record(Category, LogRecord),
    Flush(oneshot::Sender<()>),
}

/// Routes finished records to their destination without ever blocking
/// or failing the caller.
///
/// Records are handed to a background worker over a bounded channel;
/// when the channel is full the record is dropped and counted rather
/// than stalling the request path. The worker serializes all console,
/// file and sink I/O, so a request/response pair enqueued back-to-back
/// stays in order on every destination.
pub struct EmissionRouter {
    sender: mpsc::Sender<Envelope>,
    /// Records dropped because the channel was full.
    pub dropped: Arc<AtomicU64>,
}

impl EmissionRouter {
    /// Create a router and spawn its worker task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(config: RouterConfig) -> Self {
        // Enforce a minimal capacity to avoid degenerate configs.
        let capacity = config.channel_capacity.max(16);
        let (tx, rx) = mpsc::channel::<Envelope>(capacity);
        let dropped = Arc::new(AtomicU64::new(0));

        tokio::spawn(worker(rx, config));

        EmissionRouter {
            sender: tx,
            dropped,
        }
    }

    /// Enqueue one record. Never blocks, never panics; on overflow the
    /// record is counted as dropped and a local diagnostic is emitted.
    pub fn route(&self, category: Category, record: LogRecord) {
        if self.sender.try_send(Envelope::Record(category, record)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("emission channel full, dropping log record");
        }
    }

    /// Wait until everything enqueued so far has been written out.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Envelope::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

async fn worker(mut rx: mpsc::Receiver<Envelope>, config: RouterConfig) {
    let mut dev_log = match config.mode {
        RunMode::Development => Some(RollingFile::new(&config.log_path)),
        RunMode::Production => None,
    };

    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Record(category, record) => match config.mode {
                RunMode::Development => {
                    console::print_line(&record);
                    let log = dev_log.as_mut().expect("development log open");
                    match serde_json::to_string(&record) {
                        Ok(line) => {
                            if let Err(e) = log.append_line(&line) {
                                tracing::warn!(error = %e, "failed to append to local log");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping unserializable log record");
                        }
                    }
                }
                RunMode::Production => match &config.sink {
                    Some(sink) => {
                        if let Err(e) = sink.emit(category.as_str(), &record).await {
                            tracing::warn!(
                                category = category.as_str(),
                                error = %e,
                                "log sink emit failed, record dropped"
                            );
                        }
                    }
                    None => {
                        tracing::warn!("no valid log sink configured, record dropped");
                    }
                },
            },
            Envelope::Flush(ack) => {
                if let Some(sink) = &config.sink {
                    let _ = sink.flush().await;
                }
                let _ = ack.send(());
            }
        }
    }
}
