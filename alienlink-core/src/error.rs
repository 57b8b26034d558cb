//! Error types for alienlink-core

use crate::session::ConnectionState;

/// Result type alias for alienlink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Login started while a session is already open or opening
    #[error("Already connected (state: {state:?})")]
    AlreadyConnected {
        state: ConnectionState,
    },
    
    /// Command issued outside the `Ready` state
    #[error("Not ready for a command (state: {state:?})")]
    NotReady {
        state: ConnectionState,
    },
    
    /// Response too short for the echo/separator/prompt framing
    #[error("Malformed response: expected at least {expected} lines, got {actual}")]
    MalformedResponse {
        expected: usize,
        actual: usize,
    },
    
    /// Command text would break line framing
    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),
}

impl Error {
    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::MalformedResponse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_is_recoverable() {
        assert!(Error::NotReady { state: ConnectionState::AwaitingCommandResponse }.is_recoverable());
        assert!(Error::MalformedResponse { expected: 3, actual: 1 }.is_recoverable());
        assert!(!Error::AlreadyConnected { state: ConnectionState::Ready }.is_recoverable());
        assert!(!Error::InvalidCommand("a\r\nb".into()).is_recoverable());
    }
}
