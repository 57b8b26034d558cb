//! TCP transport 

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// TCP transport for the reader's control port
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    local_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            local_addr: None,
            stream: None,
            connect_timeout: Some(Duration::from_secs(5)),
        }
    }
    
    /// Set connection timeout (`None` waits for the OS)
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
    
    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }
        
        let addr_str = format!("{}:{}", self.addr, self.port);
        
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();
        
        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;
        
        self.socket_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        
        let addr = self.resolve_addr().await?;
        
        debug!("Connecting to {}...", addr);
        
        let stream = match self.connect_timeout {
            Some(limit) => timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| Error::ConnectionTimeout)?
                .map_err(Error::Io)?,
            None => TcpStream::connect(addr).await.map_err(Error::Io)?,
        };
        
        // Commands are short lines; don't let Nagle hold them back
        stream.set_nodelay(true)?;
        
        self.local_addr = Some(stream.local_addr()?);
        debug!("Connected to {} from {:?}", addr, self.local_addr);
        
        self.stream = Some(stream);
        Ok(())
    }
    
    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}...", self.remote_addr());
            
            // Graceful shutdown
            let _ = stream.shutdown().await;
        }
        
        self.socket_addr = None;
        self.local_addr = None;
        Ok(())
    }
    
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
    
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        
        trace!("Sending {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(32)]));
        
        stream.write_all(data).await?;
        stream.flush().await?;
        
        Ok(())
    }
    
    async fn receive(&mut self) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        
        let mut buf = BytesMut::with_capacity(1024);
        
        let n = stream.read_buf(&mut buf).await.map_err(Error::Io)?;
        
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        
        trace!("Received {} bytes: {}", n, hex::encode(&buf[..n.min(32)]));
        
        Ok(buf)
    }
    
    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
    
    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    
    #[tokio::test]
    async fn test_tcp_transport_create() {
        let transport = TcpTransport::new("192.168.1.201", 20000);
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "192.168.1.201:20000");
        assert!(transport.local_addr().is_none());
    }
    
    #[tokio::test]
    async fn test_tcp_transport_invalid_address() {
        let mut transport = TcpTransport::new("invalid..address", 20000)
            .with_connect_timeout(Some(Duration::from_millis(100)));
        
        let result = transport.connect().await;
        assert!(result.is_err());
    }
    
    #[tokio::test]
    async fn test_tcp_transport_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"Username>").await.unwrap();
            let mut buf = [0u8; 6];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });
        
        let mut transport = TcpTransport::new("127.0.0.1", port);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.local_addr().unwrap().ip().to_string(), "127.0.0.1");
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));
        
        let mut received = BytesMut::new();
        while received.len() < 9 {
            received.extend_from_slice(&transport.receive().await.unwrap());
        }
        assert_eq!(&received[..], b"Username>");
        
        transport.send(b"alien\n").await.unwrap();
        assert_eq!(&server.await.unwrap(), b"alien\n");
        
        // Server side is gone now
        assert!(matches!(transport.receive().await, Err(Error::ConnectionClosed)));
        
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
    
    #[tokio::test]
    async fn test_send_when_disconnected() {
        let mut transport = TcpTransport::new("127.0.0.1", 20000);
        assert!(matches!(transport.send(b"x").await, Err(Error::NotConnected)));
    }
}
