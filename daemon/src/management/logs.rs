use crafthost_protocol::management::server::{LogEntry, LogLevel};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Bounded console history for one server. The stream reader task is the
/// single writer; UI polls read concurrently and never mutate.
pub struct LogBuffer {
    cap: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.cap {
            entries.pop_front();
        }
        entries.push_back(LogEntry::now(level, message));
    }

    /// The most recent `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One buffer per server id. Buffers outlive the producing process so the
/// console history stays viewable; they are dropped on server deletion.
pub struct LogBuffers {
    cap: usize,
    // use ahash to speed up ops
    buffers: scc::HashMap<Uuid, Arc<LogBuffer>, ahash::RandomState>,
}

impl LogBuffers {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buffers: scc::HashMap::default(),
        }
    }

    /// Buffer for `id`, created on first use.
    pub fn acquire(&self, id: Uuid) -> Arc<LogBuffer> {
        self.buffers
            .entry(id)
            .or_insert_with(|| Arc::new(LogBuffer::new(self.cap)))
            .get()
            .clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<LogBuffer>> {
        self.buffers.read(&id, |_, buffer| Arc::clone(buffer))
    }

    pub fn remove(&self, id: Uuid) {
        self.buffers.remove(&id);
    }
}
