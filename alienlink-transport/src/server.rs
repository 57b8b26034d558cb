//! Inbound TCP server for reader notifications
//!
//! The reader opens a connection to the address given with
//! `NotifyAddress=` whenever it has something to report.

use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace};

use crate::error::*;

/// Listening socket for notification connections
pub struct NotificationServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl NotificationServer {
    /// Bind to `addr` (`host:port`; port 0 picks one)
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        
        debug!("Notification server listening on {}", local_addr);
        
        Ok(Self {
            listener,
            local_addr,
        })
    }
    
    /// Wait for the next reader connection
    pub async fn accept(&self) -> Result<InboundConnection> {
        let (stream, peer) = self.listener.accept().await?;
        debug!("Accepted notification connection from {}", peer);
        Ok(InboundConnection { stream, peer })
    }
    
    /// Bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// One accepted notification connection
pub struct InboundConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl InboundConnection {
    /// Read the next chunk; `None` once the reader closed the connection
    pub async fn receive(&mut self) -> Result<Option<BytesMut>> {
        let mut buf = BytesMut::with_capacity(4096);
        let n = self.stream.read_buf(&mut buf).await?;
        
        if n == 0 {
            trace!("Notification connection {} closed", self.peer);
            return Ok(None);
        }
        
        trace!("Received {} notification bytes from {}", n, self.peer);
        Ok(Some(buf))
    }
    
    /// Remote (reader) address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}
