//! Control session state machine
//!
//! A session tracks one control connection from the first byte after the
//! TCP connect to teardown:
//! - Login handshake (username, password, first prompt)
//! - Single in-flight command and its response
//! - Unsolicited output while idle
//!
//! It does no I/O. Bytes read from the socket go into [`Session::feed`],
//! which returns the [`Action`]s the owner has to carry out.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::constants::{
    COMMAND_PROMPT, COMMAND_TERMINATOR, LOGIN_TERMINATOR, PASSWORD_PROMPT, USERNAME_PROMPT,
};
use crate::error::{Error, Result};
use crate::framer::LineFramer;
use crate::response::extract_response;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket
    Disconnected,
    
    /// Socket open, waiting for `Username>`
    AwaitingUsernamePrompt,
    
    /// Username sent, waiting for `Password>`
    AwaitingPasswordPrompt,
    
    /// Password sent, waiting for the first `Alien>`
    AwaitingFirstPrompt,
    
    /// Logged in, no command outstanding
    Ready,
    
    /// Command sent, waiting for the closing `Alien>`
    AwaitingCommandResponse,
}

impl ConnectionState {
    /// Marker that moves this state forward, if any
    pub fn awaited_marker(self) -> Option<Marker> {
        match self {
            Self::AwaitingUsernamePrompt => Some(Marker::Username),
            Self::AwaitingPasswordPrompt => Some(Marker::Password),
            Self::AwaitingFirstPrompt | Self::AwaitingCommandResponse => Some(Marker::Prompt),
            Self::Disconnected | Self::Ready => None,
        }
    }
    
    /// Login handshake in progress
    pub fn is_logging_in(self) -> bool {
        matches!(
            self,
            Self::AwaitingUsernamePrompt | Self::AwaitingPasswordPrompt | Self::AwaitingFirstPrompt
        )
    }
}

/// Literal substrings that drive transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Username,
    Password,
    Prompt,
}

impl Marker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Username => USERNAME_PROMPT,
            Self::Password => PASSWORD_PROMPT,
            Self::Prompt => COMMAND_PROMPT,
        }
    }
}

/// Input to the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The awaited marker is in the buffer
    Marker(Marker),
    
    /// Data arrived and no marker is awaited
    Data,
}

/// Side effect of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SendUsername,
    SendPassword,
    CompleteLogin,
    CompleteCommand,
    BufferUnsolicited,
}

/// Transition table
///
/// Returns `None` when the event does not apply to the state, in which
/// case nothing changes.
pub fn transition(state: ConnectionState, event: Event) -> Option<(ConnectionState, Effect)> {
    use ConnectionState::*;
    
    match (state, event) {
        (AwaitingUsernamePrompt, Event::Marker(Marker::Username)) => {
            Some((AwaitingPasswordPrompt, Effect::SendUsername))
        }
        (AwaitingPasswordPrompt, Event::Marker(Marker::Password)) => {
            Some((AwaitingFirstPrompt, Effect::SendPassword))
        }
        (AwaitingFirstPrompt, Event::Marker(Marker::Prompt)) => Some((Ready, Effect::CompleteLogin)),
        (AwaitingCommandResponse, Event::Marker(Marker::Prompt)) => {
            Some((Ready, Effect::CompleteCommand))
        }
        (Ready, Event::Data) => Some((Ready, Effect::BufferUnsolicited)),
        _ => None,
    }
}

/// What the owner of the socket has to do after a [`Session::feed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write these bytes to the control socket
    Send(Bytes),
    
    /// Login handshake finished; the session is `Ready`
    LoginComplete,
    
    /// The outstanding command finished
    CommandComplete(Result<Vec<String>>),
}

/// Control session
///
/// Owns the framer and the response buffer. Not thread-safe on its own;
/// the channel keeps it behind a mutex.
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    framer: LineFramer,
    
    /// Lines collected for the current request (or unsolicited while `Ready`)
    response: Vec<String>,
    
    username: String,
    password: String,
    
    /// Text of the outstanding command, for logging
    command: Option<String>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            framer: LineFramer::new(),
            response: Vec::new(),
            username: username.into(),
            password: password.into(),
            command: None,
        }
    }
    
    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }
    
    /// Check if a command can be issued
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }
    
    /// Start the login handshake once the socket is connected
    pub fn begin_login(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(Error::AlreadyConnected { state: self.state });
        }
        
        self.framer.clear();
        self.response.clear();
        self.state = ConnectionState::AwaitingUsernamePrompt;
        
        debug!("Login started, waiting for {}", USERNAME_PROMPT);
        Ok(())
    }
    
    /// Start a command and return the bytes to write
    ///
    /// Fails without touching any state if the session is not `Ready`,
    /// which includes having another command outstanding.
    pub fn begin_command(&mut self, command: &str) -> Result<Bytes> {
        if self.state != ConnectionState::Ready {
            return Err(Error::NotReady { state: self.state });
        }
        if command.contains(['\r', '\n']) {
            return Err(Error::InvalidCommand(command.to_string()));
        }
        
        if !self.response.is_empty() {
            debug!(lines = self.response.len(), "Discarding unsolicited output");
        }
        self.framer.clear();
        self.response.clear();
        self.command = Some(command.to_string());
        self.state = ConnectionState::AwaitingCommandResponse;
        
        debug!(command, "Command started");
        Ok(Bytes::from(format!("{}{}", command, COMMAND_TERMINATOR)))
    }
    
    /// Feed bytes read from the socket
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Action> {
        self.framer.feed(chunk);
        
        let event = match self.state.awaited_marker() {
            Some(marker) if self.framer.contains_marker(marker.as_str()) => Event::Marker(marker),
            Some(_) => return Vec::new(),
            None => Event::Data,
        };
        
        let Some((next, effect)) = transition(self.state, event) else {
            trace!(state = ?self.state, len = chunk.len(), "Dropping data");
            self.framer.clear();
            return Vec::new();
        };
        
        trace!(from = ?self.state, to = ?next, ?effect, "Transition");
        self.state = next;
        
        match effect {
            Effect::SendUsername => {
                self.framer.clear();
                vec![Action::Send(login_line(&self.username))]
            }
            Effect::SendPassword => {
                self.framer.clear();
                vec![Action::Send(login_line(&self.password))]
            }
            Effect::CompleteLogin => {
                self.framer.clear();
                debug!("Login complete");
                vec![Action::LoginComplete]
            }
            Effect::CompleteCommand => {
                self.response.extend(self.framer.drain_lines());
                let result = extract_response(&self.response);
                self.response.clear();
                
                let command = self.command.take().unwrap_or_default();
                debug!(command = %command, ok = result.is_ok(), "Command complete");
                vec![Action::CommandComplete(result)]
            }
            Effect::BufferUnsolicited => {
                let lines = self.framer.drain_complete_lines();
                if !lines.is_empty() {
                    debug!(lines = lines.len(), "Unsolicited output while idle");
                    self.response.extend(lines);
                }
                Vec::new()
            }
        }
    }
    
    /// Take unsolicited lines received while `Ready`
    pub fn take_unsolicited(&mut self) -> Vec<String> {
        if self.state == ConnectionState::Ready {
            std::mem::take(&mut self.response)
        } else {
            Vec::new()
        }
    }
    
    /// Close session
    pub fn reset(&mut self) {
        self.framer.clear();
        self.response.clear();
        self.command = None;
        self.state = ConnectionState::Disconnected;
    }
}

fn login_line(value: &str) -> Bytes {
    Bytes::from(format!("{}{}", value, LOGIN_TERMINATOR))
}
