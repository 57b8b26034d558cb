//! Notification listener
//!
//! The reader connects to us (see `NotifyAddress=`) to push tag reads.
//! Every chunk read from such a connection becomes one
//! [`NotificationBatch`]: complete lines, filtered, handed to the sink.
//! The sink gets a call even when nothing survived the filter.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use alienlink_core::notification::filter_lines;
use alienlink_core::LineFramer;
use alienlink_transport::{InboundConnection, NotificationServer};
use alienlink_types::NotificationBatch;

use crate::error::Result;

/// Pause after a failed accept (usually fd exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Consumer of notification batches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Handle one batch (possibly empty)
    async fn process_notifications(&self, batch: NotificationBatch);
}

/// Running accept loop
struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Counters, for progress reporting only
#[derive(Debug, Default)]
struct Stats {
    batches: AtomicU64,
    lines: AtomicU64,
}

/// Accepts reader connections and forwards filtered batches
pub struct NotificationListener {
    bind_addr: String,
    sink: Arc<dyn NotificationSink>,
    running: Mutex<Option<Running>>,
    stats: Arc<Stats>,
}

impl NotificationListener {
    /// Create a stopped listener for `bind_addr` (`host:port`)
    pub fn new(bind_addr: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            sink,
            running: Mutex::new(None),
            stats: Arc::new(Stats::default()),
        }
    }
    
    /// Start accepting connections; returns the bound address
    ///
    /// Calling this while running returns the existing address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(running) = running.as_ref() {
            return Ok(running.local_addr);
        }
        
        let server = NotificationServer::bind(&self.bind_addr).await?;
        let local_addr = server.local_addr();
        let cancel = CancellationToken::new();
        
        let task = tokio::spawn(accept_loop(
            server,
            Arc::clone(&self.sink),
            Arc::clone(&self.stats),
            cancel.clone(),
        ));
        
        info!("Listening for notifications on {}", local_addr);
        *running = Some(Running {
            local_addr,
            cancel,
            task,
        });
        Ok(local_addr)
    }
    
    /// Stop accepting and close every open notification connection
    ///
    /// Does nothing if not running.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!("Notification accept loop ended abnormally: {}", e);
        }
        
        info!(
            batches = self.batches_received(),
            lines = self.lines_received(),
            "Stopped listening on {}",
            running.local_addr
        );
    }
    
    /// Bound address while running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }
    
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
    
    /// Batches forwarded so far
    pub fn batches_received(&self) -> u64 {
        self.stats.batches.load(Ordering::Relaxed)
    }
    
    /// Lines forwarded so far
    pub fn lines_received(&self) -> u64 {
        self.stats.lines.load(Ordering::Relaxed)
    }
}

async fn accept_loop(
    server: NotificationServer,
    sink: Arc<dyn NotificationSink>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    let mut connections = JoinSet::new();
    
    'accept: loop {
        tokio::select! {
            biased;
            
            _ = cancel.cancelled() => break 'accept,
            
            Some(finished) = connections.join_next() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        warn!("Notification connection task panicked: {}", e);
                    }
                }
            }
            
            accepted = server.accept() => match accepted {
                Ok(conn) => {
                    connections.spawn(handle_connection(conn, Arc::clone(&sink), Arc::clone(&stats)));
                }
                Err(e) => {
                    // Usually fd exhaustion; back off instead of spinning
                    warn!("Accepting notification connection failed: {}", e);
                    if back_off(&cancel).await {
                        break 'accept;
                    }
                }
            },
        }
    }
    
    debug!(open = connections.len(), "Closing notification connections");
    connections.shutdown().await;
}

/// Pause after a failed accept; true if stopped meanwhile
async fn back_off(cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => false,
    }
}

async fn handle_connection(
    mut conn: InboundConnection,
    sink: Arc<dyn NotificationSink>,
    stats: Arc<Stats>,
) {
    let peer = conn.peer();
    let mut framer = LineFramer::new();
    
    loop {
        match conn.receive().await {
            Ok(Some(chunk)) => {
                framer.feed(&chunk);
                let lines = filter_lines(framer.drain_complete_lines());
                deliver(&*sink, &stats, lines, peer).await;
            }
            Ok(None) => {
                if !framer.is_empty() {
                    let lines = filter_lines(framer.drain_lines());
                    deliver(&*sink, &stats, lines, peer).await;
                }
                break;
            }
            Err(e) => {
                warn!(%peer, "Notification connection failed: {}", e);
                break;
            }
        }
    }
    
    debug!(%peer, "Notification connection closed");
}

async fn deliver(sink: &dyn NotificationSink, stats: &Stats, lines: Vec<String>, peer: SocketAddr) {
    let batches = stats.batches.fetch_add(1, Ordering::Relaxed) + 1;
    let total = stats.lines.fetch_add(lines.len() as u64, Ordering::Relaxed) + lines.len() as u64;
    trace!(%peer, lines = lines.len(), batches, total, "Forwarding notification batch");
    
    sink.process_notifications(NotificationBatch::new(lines, peer)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    
    /// Sink that forwards every batch's lines to a channel
    struct ChannelSink(mpsc::UnboundedSender<Vec<String>>);
    
    #[async_trait]
    impl NotificationSink for ChannelSink {
        async fn process_notifications(&self, batch: NotificationBatch) {
            let _ = self.0.send(batch.lines);
        }
    }
    
    async fn started() -> (NotificationListener, SocketAddr, mpsc::UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = NotificationListener::new("127.0.0.1:0", Arc::new(ChannelSink(tx)));
        let addr = listener.start().await.unwrap();
        (listener, addr, rx)
    }
    
    async fn next_batch(rx: &mut mpsc::UnboundedReceiver<Vec<String>>) -> Vec<String> {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no batch delivered")
            .expect("sink dropped")
    }
    
    #[tokio::test]
    async fn test_back_off_ends_on_stop() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        
        let stopped = timeout(Duration::from_millis(10), back_off(&cancel)).await;
        assert!(matches!(stopped, Ok(true)));
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_back_off_waits() {
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        
        assert!(!back_off(&cancel).await);
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }
    
    #[tokio::test]
    async fn test_filters_batch() {
        let (listener, addr, mut rx) = started().await;
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"#comment\r\ntag1\r\nNo Tags\r\nok\r\nx\r\n").await.unwrap();
        
        assert_eq!(next_batch(&mut rx).await, vec!["tag1"]);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_noise_only_chunk_still_delivered() {
        let (listener, addr, mut rx) = started().await;
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"#Alien RFID Reader Auto Notification Message\r\nNo Tags\r\n").await.unwrap();
        
        assert!(next_batch(&mut rx).await.is_empty());
        assert_eq!(listener.batches_received(), 1);
        assert_eq!(listener.lines_received(), 0);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_line_split_across_reads() {
        let (listener, addr, mut rx) = started().await;
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"dock-3,0,E200 34").await.unwrap();
        assert!(next_batch(&mut rx).await.is_empty());
        
        reader.write_all(b"11,-61.2\r\n").await.unwrap();
        assert_eq!(next_batch(&mut rx).await, vec!["dock-3,0,E200 3411,-61.2"]);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_remainder_flushed_on_close() {
        let (listener, addr, mut rx) = started().await;
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"tag-without-newline").await.unwrap();
        assert!(next_batch(&mut rx).await.is_empty());
        
        drop(reader);
        assert_eq!(next_batch(&mut rx).await, vec!["tag-without-newline"]);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_connections_independent() {
        let (listener, addr, mut rx) = started().await;
        
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        
        first.write_all(b"first-").await.unwrap();
        assert!(next_batch(&mut rx).await.is_empty());
        
        // A partial line on one connection never joins another connection's data
        second.write_all(b"second\r\n").await.unwrap();
        assert_eq!(next_batch(&mut rx).await, vec!["second"]);
        
        first.write_all(b"half\r\n").await.unwrap();
        assert_eq!(next_batch(&mut rx).await, vec!["first-half"]);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (listener, addr, _rx) = started().await;
        
        assert_eq!(listener.start().await.unwrap(), addr);
        assert!(listener.is_running().await);
        
        listener.stop().await;
        listener.stop().await;
        assert!(!listener.is_running().await);
        assert!(listener.local_addr().await.is_none());
    }
    
    #[tokio::test]
    async fn test_stop_closes_connections() {
        let (listener, addr, mut rx) = started().await;
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"tag1\r\n").await.unwrap();
        next_batch(&mut rx).await;
        
        listener.stop().await;
        
        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(5), reader.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
    
    #[tokio::test]
    async fn test_bind_failure() {
        let (listener, addr, _rx) = started().await;
        
        let (tx, _rx2) = mpsc::unbounded_channel();
        let other = NotificationListener::new(addr.to_string(), Arc::new(ChannelSink(tx)));
        
        assert!(other.start().await.is_err());
        assert!(!other.is_running().await);
        
        listener.stop().await;
    }
    
    #[tokio::test]
    async fn test_sink_called_once_per_chunk() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        
        let mut sink = MockNotificationSink::new();
        sink.expect_process_notifications()
            .times(1)
            .returning(move |batch| {
                let _ = seen_tx.send((batch.lines, batch.peer));
            });
        
        let listener = NotificationListener::new("127.0.0.1:0", Arc::new(sink));
        let addr = listener.start().await.unwrap();
        
        let mut reader = TcpStream::connect(addr).await.unwrap();
        let local = reader.local_addr().unwrap();
        reader.write_all(b"tag1\r\ntag2\r\n").await.unwrap();
        
        let (lines, peer) = timeout(Duration::from_secs(5), seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(lines, vec!["tag1", "tag2"]);
        assert_eq!(peer, local);
        
        listener.stop().await;
    }
}
