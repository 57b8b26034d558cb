//! Type definitions for alienlink

pub mod config;
pub mod error;
pub mod notification;

pub use config::ReaderConfig;
pub use error::{Error, Result};
pub use notification::NotificationBatch;
