//! In-process stand-in for a reader's control port

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use alienlink_types::ReaderConfig;

/// Config pointing at `listener`, with a short login timeout so a broken
/// test fails instead of hanging
pub(crate) fn reader_config(listener: &TcpListener) -> ReaderConfig {
    let port = listener.local_addr().unwrap().port();
    ReaderConfig::new("127.0.0.1", port)
        .with_notify("127.0.0.1", 0)
        .with_login_timeout(Some(Duration::from_secs(5)))
        .with_command_timeout(Some(Duration::from_secs(5)))
}

pub(crate) struct FakeReader {
    socket: TcpStream,
}

impl FakeReader {
    pub(crate) async fn accept(listener: &TcpListener) -> Self {
        let (socket, _) = listener.accept().await.unwrap();
        Self { socket }
    }
    
    pub(crate) async fn send(&mut self, data: &str) {
        self.socket.write_all(data.as_bytes()).await.unwrap();
        self.socket.flush().await.unwrap();
    }
    
    /// Read up to and including the next `\n`
    pub(crate) async fn read_line(&mut self) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = timeout(Duration::from_secs(5), self.socket.read(&mut byte))
                .await
                .expect("reader timed out waiting for a line")
                .unwrap();
            if n == 0 {
                break;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        String::from_utf8(line).unwrap()
    }
    
    /// Standard login exchange with default credentials
    pub(crate) async fn login(&mut self) {
        self.send("Username>").await;
        assert_eq!(self.read_line().await, "alien\n");
        self.send("Password>").await;
        assert_eq!(self.read_line().await, "password\n");
        self.send("\r\nAlien>").await;
    }
    
    /// Answer one command with an echo, `reply` lines, separator and prompt
    pub(crate) async fn answer(&mut self, reply: &[&str]) -> String {
        let line = self.read_line().await;
        let command = line.trim_end().to_string();
        
        let mut response = format!("{}\r\n", command);
        for reply_line in reply {
            response.push_str(reply_line);
            response.push_str("\r\n");
        }
        response.push_str("\r\nAlien>");
        self.send(&response).await;
        
        command
    }
    
    /// Read until the peer closes; `None` if it stays open
    pub(crate) async fn drain(&mut self) -> Option<String> {
        let mut rest = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            match timeout(Duration::from_secs(5), self.socket.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return Some(String::from_utf8_lossy(&rest).into_owned()),
                Ok(Ok(n)) => rest.extend_from_slice(&buf[..n]),
                Err(_) => return None,
            }
        }
    }
    
    /// Check the peer closed the connection
    pub(crate) async fn at_eof(&mut self) -> bool {
        self.drain().await.is_some()
    }
    
    pub(crate) async fn close(mut self) {
        let _ = self.socket.shutdown().await;
    }
}
