//! High-level error types

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] alienlink_core::Error),
    
    #[error("Connection error: {0}")]
    Connection(#[from] alienlink_transport::Error),
    
    #[error("Configuration error: {0}")]
    InvalidConfig(#[from] alienlink_types::Error),
    
    #[error("Request cancelled by disconnect")]
    Cancelled,
    
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    
    #[error("Reader rejected {command:?}: {reply}")]
    CommandRejected {
        command: String,
        reply: String,
    },
    
    #[error("Setup aborted at step {step} ({command}): {source}")]
    SetupAborted {
        step: usize,
        command: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Request was rejected because the channel was not `Ready`
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Core(alienlink_core::Error::NotReady { .. }))
    }
    
    /// Request was released by a disconnect
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
    
    /// Check if the same request might succeed on the open channel
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::CommandRejected { .. } => true,
            Self::SetupAborted { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
    
    /// Check if error requires reconnection
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } => true,
            Self::SetupAborted { source, .. } => source.requires_reconnect(),
            _ => false,
        }
    }
}
