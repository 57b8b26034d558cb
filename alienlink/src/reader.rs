//! High-level reader interface

use std::sync::Arc;

use tracing::{info, warn};

use alienlink_core::ConnectionState;
use alienlink_types::ReaderConfig;

use crate::control::ControlChannel;
use crate::error::{Error, Result};
use crate::listener::{NotificationListener, NotificationSink};
use crate::setup::SetupSequencer;

/// Alien RFID reader
///
/// Owns both channels: the control connection we open to the reader and
/// the notification listener the reader connects back to.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use alienlink::{async_trait, NotificationBatch, NotificationSink, Reader, ReaderConfig};
///
/// struct Print;
///
/// #[async_trait]
/// impl NotificationSink for Print {
///     async fn process_notifications(&self, batch: NotificationBatch) {
///         for line in batch.lines {
///             println!("{}", line);
///         }
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> alienlink::Result<()> {
///     let reader = Reader::new(ReaderConfig::new("192.168.1.100", 23), Arc::new(Print));
///     
///     reader.start().await?;
///     tokio::time::sleep(Duration::from_secs(60)).await;
///     reader.stop().await?;
///     Ok(())
/// }
/// ```
pub struct Reader {
    channel: ControlChannel,
    listener: NotificationListener,
}

impl Reader {
    /// Create a reader; nothing is opened until [`Reader::start`]
    pub fn new(config: ReaderConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let bind_addr = format!("{}:{}", config.notify_bind, config.notify_port);
        
        Self {
            listener: NotificationListener::new(bind_addr, sink),
            channel: ControlChannel::new(config),
        }
    }
    
    /// Control channel
    pub fn channel(&self) -> &ControlChannel {
        &self.channel
    }
    
    /// Notification listener
    pub fn listener(&self) -> &NotificationListener {
        &self.listener
    }
    
    /// Check if the control channel is ready for commands
    pub fn is_connected(&self) -> bool {
        self.channel.is_ready()
    }
    
    /// Listen, connect, log in and configure the reader
    ///
    /// The listener starts first so its port is known for `NotifyAddress=`.
    /// On failure only what this call opened is shut again; a reader that
    /// is already running is left as it was.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration does not validate
    /// - `AlreadyConnected` unless the control channel is `Disconnected`
    /// - any connect, login or setup error, after cleanup
    pub async fn start(&self) -> Result<()> {
        self.channel.config().validate()?;
        
        let state = self.channel.state();
        if state != ConnectionState::Disconnected {
            return Err(alienlink_core::Error::AlreadyConnected { state }.into());
        }
        
        info!("Starting {}", self.channel.config());
        
        let was_listening = self.listener.is_running().await;
        let notify_addr = self.listener.start().await?;
        
        if let Err(e) = self.configure(notify_addr.port()).await {
            warn!("Reader start failed: {}", e);
            self.undo_start(&e, was_listening).await;
            return Err(e);
        }
        
        info!("Reader started, notifications on port {}", notify_addr.port());
        Ok(())
    }
    
    async fn undo_start(&self, error: &Error, was_listening: bool) {
        // Another start won the race for the channel; it is not ours to close
        let lost_race = matches!(
            error,
            Error::Core(alienlink_core::Error::AlreadyConnected { .. })
        );
        
        if !lost_race {
            if let Err(e) = self.channel.disconnect().await {
                warn!("Cleanup after failed start also failed: {}", e);
            }
        }
        if !was_listening && !lost_race {
            self.listener.stop().await;
        }
    }
    
    async fn configure(&self, notify_port: u16) -> Result<()> {
        self.channel.connect().await?;
        
        let sequencer = SetupSequencer::for_channel(&self.channel, notify_port)?;
        sequencer.run(&self.channel).await
    }
    
    /// Run an ad hoc command on the control channel
    pub async fn run_command(&self, command: &str) -> Result<Vec<String>> {
        self.channel.run_command(command).await
    }
    
    /// Disconnect and stop listening
    pub async fn stop(&self) -> Result<()> {
        self.channel.disconnect().await?;
        self.listener.stop().await;
        Ok(())
    }
}
