//! # alienlink-core
//!
//! Core protocol implementation for Alien RFID readers.
//!
//! This crate provides the socket-free protocol primitives:
//! - Line framing over fragmented reads
//! - Login/command state machine
//! - Response framing
//! - Command definitions and the setup list
//! - Notification line filter

pub mod command;
pub mod constants;
pub mod error;
pub mod framer;
pub mod notification;
pub mod response;
pub mod session;

pub use command::Command;
pub use error::{Error, Result};
pub use framer::LineFramer;
pub use session::{Action, ConnectionState, Session};
