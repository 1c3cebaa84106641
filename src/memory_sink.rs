use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use std::sync::Mutex;

/// A sink that buffers everything in memory.
///
/// Exists for tests and local inspection: emitted records can be drained
/// and asserted on without any transport in the way.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, LogRecord)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything emitted so far, in emission order.
    pub fn take(&self) -> Vec<(String, LogRecord)> {
        std::mem::take(&mut self.records.lock().expect("memory sink lock"))
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("memory sink lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn emit(&self, category: &str, record: &LogRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .expect("memory sink lock")
            .push((category.to_string(), record.clone()));
        Ok(())
    }
}
