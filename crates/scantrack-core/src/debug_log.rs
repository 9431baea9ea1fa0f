use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Maximum number of events retained in the ring buffer.
const EVENT_LOG_CAPACITY: usize = 200;

/// Which record store call an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    List,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A typed event from the synchronization layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    SessionStarted {
        user: String,
    },
    SessionEnded,
    Listed {
        count: usize,
    },
    CoverResolved {
        title: String,
        found: bool,
    },
    CoverLookupFailed {
        title: String,
        message: String,
    },
    /// A store call failed. For optimistic writes the local change stays.
    StoreFailed {
        op: StoreOp,
        record_id: Option<String>,
        message: String,
    },
}

impl std::fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionStarted { user } => write!(f, "session started for {user}"),
            Self::SessionEnded => write!(f, "session ended"),
            Self::Listed { count } => write!(f, "listed {count} records"),
            Self::CoverResolved { title, found: true } => write!(f, "cover found for {title}"),
            Self::CoverResolved { title, found: false } => {
                write!(f, "no cover for {title}, using placeholder")
            }
            Self::CoverLookupFailed { title, message } => {
                write!(f, "cover lookup for {title} failed: {message}")
            }
            Self::StoreFailed {
                op,
                record_id: Some(id),
                message,
            } => write!(f, "{op} of {id} failed: {message}"),
            Self::StoreFailed {
                op,
                record_id: None,
                message,
            } => write!(f, "{op} failed: {message}"),
        }
    }
}

/// A timestamped event entry.
pub type EventEntry = (DateTime<Utc>, SyncEvent);

/// Bounded ring buffer of sync events.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Push a new event, evicting the oldest if at capacity.
    pub fn push(&mut self, event: SyncEvent) {
        if self.entries.len() >= EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((Utc::now(), event));
    }

    /// Return a snapshot of all entries (newest last).
    pub fn snapshot(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, e)| {
                matches!(
                    e,
                    SyncEvent::StoreFailed { .. } | SyncEvent::CoverLookupFailed { .. }
                )
            })
            .count()
    }
}

/// Thread-safe handle to the event log.
pub type SharedEventLog = Arc<Mutex<EventLog>>;

/// Create a new shared event log.
pub fn shared_event_log() -> SharedEventLog {
    Arc::new(Mutex::new(EventLog::new()))
}

/// Push onto a shared log, ignoring a poisoned lock.
pub fn record(log: &SharedEventLog, event: SyncEvent) {
    if let Ok(mut log) = log.lock() {
        log.push(event);
    }
}
