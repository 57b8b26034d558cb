//! Post-login reader configuration
//!
//! Runs the fixed setup list one command at a time. The first failure
//! stops the sequence; nothing is retried and nothing after the failing
//! command is sent.

use std::net::IpAddr;

use tracing::{debug, info, warn};

use alienlink_core::Command;
use alienlink_transport::Error as TransportError;
use alienlink_types::ReaderConfig;

use crate::control::ControlChannel;
use crate::error::{Error, Result};

/// Ordered setup commands for one reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSequencer {
    commands: Vec<Command>,
}

impl SetupSequencer {
    /// Build the sequence for `config`, telling the reader to send
    /// notifications to `notify_host:notify_port`
    pub fn new(config: &ReaderConfig, notify_host: IpAddr, notify_port: u16) -> Self {
        let mut commands = vec![
            Command::ReaderName(config.reader_name.clone()),
            Command::AntennaSequence(config.antenna_sequence()),
            Command::NotifyAddress {
                host: notify_host.to_string(),
                port: notify_port,
            },
        ];
        commands.extend(Command::static_setup(config.auto_stop_timer_ms, config.tag_timestamps));
        
        Self { commands }
    }
    
    /// Build the sequence using the control socket's local address as the
    /// notification host
    pub fn for_channel(channel: &ControlChannel, notify_port: u16) -> Result<Self> {
        let local = channel.local_addr().ok_or(TransportError::NotConnected)?;
        Ok(Self::new(channel.config(), local.ip(), notify_port))
    }
    
    /// Commands in the order they will be sent
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
    
    /// Send every command, waiting for each response before the next
    ///
    /// # Errors
    ///
    /// `SetupAborted` carrying the 1-based step, the command text and the
    /// underlying error.
    pub async fn run(&self, channel: &ControlChannel) -> Result<()> {
        info!(commands = self.commands.len(), "Configuring reader");
        
        for (index, command) in self.commands.iter().enumerate() {
            let wire = command.to_string();
            
            let outcome = match channel.run_command(&wire).await {
                Ok(reply) => check_reply(&wire, reply),
                Err(e) => Err(e),
            };
            
            match outcome {
                Ok(reply) => debug!(step = index + 1, command = %wire, ?reply, "Setup step done"),
                Err(e) => {
                    warn!(step = index + 1, command = %wire, "Setup aborted: {}", e);
                    return Err(Error::SetupAborted {
                        step: index + 1,
                        command: wire,
                        source: Box::new(e),
                    });
                }
            }
        }
        
        info!("Reader configured, autonomous mode on");
        Ok(())
    }
}

/// The reader answers a bad command with an `Error ...` line
fn check_reply(command: &str, reply: Vec<String>) -> Result<Vec<String>> {
    match reply.first() {
        Some(line) if line.trim_start().starts_with("Error") => Err(Error::CommandRejected {
            command: command.to_string(),
            reply: line.trim().to_string(),
        }),
        _ => Ok(reply),
    }
}
