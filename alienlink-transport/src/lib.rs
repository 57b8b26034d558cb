//! Transport layer for the Alien reader protocol
//!
//! Provides the outbound TCP control connection and the inbound TCP
//! server the reader pushes notifications to.

pub mod error;
pub mod server;
pub mod tcp;

pub use error::{Error, Result};
pub use server::{InboundConnection, NotificationServer};
pub use tcp::TcpTransport;

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for the control connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to reader
    async fn connect(&mut self) -> Result<()>;
    
    /// Disconnect from reader
    async fn disconnect(&mut self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;
    
    /// Receive whatever bytes are available (at least one)
    ///
    /// Must be cancel-safe: dropping the future before it completes loses
    /// no data.
    async fn receive(&mut self) -> Result<BytesMut>;
    
    /// Get remote address
    fn remote_addr(&self) -> String;
    
    /// Local address of the connected socket
    fn local_addr(&self) -> Option<SocketAddr>;
}
