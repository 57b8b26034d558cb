//! # alienlink
//!
//! Rust client for Alien RFID readers.
//!
//! ## Features
//!
//! - Telnet-style control channel: login, one command at a time
//! - Reader setup for autonomous inventory with tag notifications
//! - Notification listener feeding filtered line batches to your sink
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use alienlink::{ControlChannel, ReaderConfig, SetupSequencer};
//!
//! #[tokio::main]
//! async fn main() -> alienlink::Result<()> {
//!     // Connect to reader
//!     let channel = ControlChannel::new(ReaderConfig::new("192.168.1.100", 23));
//!     channel.connect().await?;
//!     
//!     // Point notifications at port 20001 and start autonomous mode
//!     SetupSequencer::for_channel(&channel, 20001)?.run(&channel).await?;
//!     
//!     // Disconnect
//!     channel.disconnect().await?;
//!     
//!     Ok(())
//! }
//! ```
//!
//! See [`Reader`] for the variant that also runs the notification listener.

pub mod control;
pub mod error;
pub mod listener;
pub mod reader;
pub mod setup;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use control::ControlChannel;
pub use error::{Error, Result};
pub use listener::{NotificationListener, NotificationSink};
pub use reader::Reader;
pub use setup::SetupSequencer;

// Re-export types
pub use alienlink_core::{Command, ConnectionState, LineFramer};
pub use alienlink_types::{NotificationBatch, ReaderConfig};

/// For implementing [`NotificationSink`]
pub use async_trait::async_trait;
