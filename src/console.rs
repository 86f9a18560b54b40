//! Ordered log of output captured from sandboxed runs.
//!
//! The sandbox bridges `console.log` / `console.error` / `console.warn`
//! calls (and uncaught errors) back to the host as structured messages; each
//! one lands here as a `LogRecord` in arrival order. The sequence is bounded
//! — a long-lived daemon must not grow without limit — with oldest-first
//! eviction once the cap is reached.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tag of one captured console call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Log,
    Error,
    Warn,
}

impl Severity {
    /// Map the wire `method` field to a severity. Unknown methods are
    /// dropped by the caller.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "log" => Some(Self::Log),
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Error => "error",
            Self::Warn => "warn",
        }
    }
}

/// One structured unit of sandbox output. Immutable once received.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// The run that produced this record. Late records from a superseded run
    /// keep their original id so clients can filter them out.
    #[serde(rename = "runId")]
    pub run_id: String,
    /// Host-assigned arrival sequence number, monotonically increasing
    /// across runs.
    pub seq: u64,
    /// Wall-clock arrival time at the host.
    pub ts: DateTime<Utc>,
    pub severity: Severity,
    /// Stringified argument values, in call order.
    pub args: Vec<String>,
}

impl LogRecord {
    /// The display form used by the console tab: `"error: a b"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.severity.as_str(), self.args.join(" "))
    }
}

struct Inner {
    records: VecDeque<LogRecord>,
    next_seq: u64,
}

/// Host-owned, bounded, arrival-ordered log sequence.
pub struct ConsoleLog {
    max_records: usize,
    inner: Mutex<Inner>,
}

impl ConsoleLog {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            inner: Mutex::new(Inner {
                records: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append one record in arrival order and return a copy of it (for
    /// broadcasting). Evicts the oldest record once the bound is hit.
    pub fn append(&self, run_id: &str, severity: Severity, args: Vec<String>) -> LogRecord {
        let mut inner = self.lock();
        let record = LogRecord {
            run_id: run_id.to_string(),
            seq: inner.next_seq,
            ts: Utc::now(),
            severity,
            args,
        };
        inner.next_seq += 1;
        inner.records.push_back(record.clone());
        while inner.records.len() > self.max_records {
            inner.records.pop_front();
        }
        record
    }

    /// Copy of the current sequence, oldest first.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.lock().records.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().records.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
