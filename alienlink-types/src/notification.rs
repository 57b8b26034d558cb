//! Notification batch delivered to the sink

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};

/// Filtered notification lines from one inbound data event
///
/// A batch may be empty. It is delivered anyway so the consumer can keep
/// its own timeout bookkeeping going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationBatch {
    /// Surviving lines, in arrival order
    pub lines: Vec<String>,
    
    /// Reader endpoint the data came from
    pub peer: SocketAddr,
    
    /// When the data event was handled
    pub received_at: DateTime<Utc>,
}

impl NotificationBatch {
    pub fn new(lines: Vec<String>, peer: SocketAddr) -> Self {
        Self {
            lines,
            peer,
            received_at: Utc::now(),
        }
    }
    
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
    
    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

impl fmt::Display for NotificationBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch[{} lines from {} at {}]",
            self.lines.len(),
            self.peer,
            self.received_at.format("%H:%M:%S%.3f")
        )
    }
}
