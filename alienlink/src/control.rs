//! Reader control channel
//!
//! One TCP connection to the reader's control port. A background task owns
//! the socket, feeds every chunk it reads into the [`Session`] state
//! machine and writes whatever the session asks for. Callers park on a
//! oneshot until the session reports the login or their command complete.
//!
//! Only one request is ever in flight. A second `run_command` while one is
//! outstanding fails right away with `NotReady`; it is not queued.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use alienlink_core::{Action, ConnectionState, Session};
use alienlink_transport::{TcpTransport, Transport};
use alienlink_types::ReaderConfig;

use crate::error::{Error, Result};

/// Continuation of the request in flight
enum Pending {
    Login(oneshot::Sender<Result<()>>),
    Command(oneshot::Sender<Result<Vec<String>>>),
}

impl Pending {
    fn fail(self, error: Error) {
        // The caller may have given up (timeout); nothing to do then
        let _ = match self {
            Self::Login(tx) => tx.send(Err(error)).map_err(|_| ()),
            Self::Command(tx) => tx.send(Err(error)).map_err(|_| ()),
        };
    }
}

/// State shared between the handle and the I/O task
struct Shared {
    session: Session,
    pending: Option<Pending>,
    
    /// Bumped on every connect so a finished I/O task never touches a newer connection
    generation: u64,
    
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    cancel: Option<CancellationToken>,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<String>,
}

/// Control connection to an Alien reader
///
/// # Examples
///
/// ```no_run
/// use alienlink::{ControlChannel, ReaderConfig};
///
/// #[tokio::main]
/// async fn main() -> alienlink::Result<()> {
///     let channel = ControlChannel::new(ReaderConfig::new("192.168.1.100", 23));
///     
///     channel.connect().await?;
///     
///     for line in channel.run_command("get ReaderVersion").await? {
///         println!("{}", line);
///     }
///     
///     channel.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct ControlChannel {
    config: ReaderConfig,
    shared: Arc<Mutex<Shared>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ControlChannel {
    /// Create a disconnected channel
    pub fn new(config: ReaderConfig) -> Self {
        let session = Session::new(config.username.clone(), config.password.clone());
        
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared {
                session,
                pending: None,
                generation: 0,
                outbound: None,
                cancel: None,
                local_addr: None,
                remote_addr: None,
            })),
            task: Mutex::new(None),
        }
    }
    
    /// Configuration this channel was built with
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
    
    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().session.state()
    }
    
    /// Check if a command can be issued
    pub fn is_ready(&self) -> bool {
        let shared = self.shared.lock();
        shared.session.is_ready() && shared.outbound.is_some()
    }
    
    /// Local address of the control socket
    ///
    /// This is the address the reader can reach us on, which is what
    /// `NotifyAddress=` needs.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.lock().local_addr
    }
    
    /// Reader address
    pub fn remote_addr(&self) -> String {
        self.shared
            .lock()
            .remote_addr
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.config.address, self.config.port))
    }
    
    /// Take lines the reader sent while no command was outstanding
    pub fn take_unsolicited(&self) -> Vec<String> {
        self.shared.lock().session.take_unsolicited()
    }
    
    /// Connect and log in
    ///
    /// # Errors
    ///
    /// - `AlreadyConnected` unless the channel is `Disconnected` and idle
    /// - `Connection` if the socket fails before the first prompt
    /// - `Timeout` if the handshake exceeds the login timeout
    /// - `Cancelled` if `disconnect` is called meanwhile
    pub async fn connect(&self) -> Result<()> {
        let transport = TcpTransport::new(self.config.address.clone(), self.config.port)
            .with_connect_timeout(self.config.connect_timeout);
        
        self.connect_with(Box::new(transport)).await
    }
    
    /// Connect over the given transport and log in
    pub async fn connect_with(&self, mut transport: Box<dyn Transport>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        
        {
            let mut shared = self.shared.lock();
            let state = shared.session.state();
            if state != ConnectionState::Disconnected || shared.pending.is_some() {
                return Err(alienlink_core::Error::AlreadyConnected { state }.into());
            }
            shared.pending = Some(Pending::Login(tx));
        }
        
        info!("Connecting to {}...", transport.remote_addr());
        
        if let Err(e) = transport.connect().await {
            let pending = self.shared.lock().pending.take();
            return match pending {
                Some(_) => Err(e.into()),
                None => Err(Error::Cancelled),
            };
        }
        
        let cancel = CancellationToken::new();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        
        // Pending may already have been released by a disconnect
        let mut rx = rx;
        let started: Result<u64> = {
            let mut shared = self.shared.lock();
            match rx.try_recv() {
                Ok(_) | Err(oneshot::error::TryRecvError::Closed) => Err(Error::Cancelled),
                Err(oneshot::error::TryRecvError::Empty) => match shared.session.begin_login() {
                    Ok(()) => {
                        shared.generation += 1;
                        shared.outbound = Some(out_tx);
                        shared.cancel = Some(cancel.clone());
                        shared.local_addr = transport.local_addr();
                        shared.remote_addr = Some(transport.remote_addr());
                        Ok(shared.generation)
                    }
                    Err(e) => {
                        shared.pending = None;
                        Err(e.into())
                    }
                },
            }
        };
        
        let generation = match started {
            Ok(generation) => generation,
            Err(e) => {
                let _ = transport.disconnect().await;
                return Err(e);
            }
        };
        
        let handle = tokio::spawn(io_loop(
            transport,
            Arc::clone(&self.shared),
            out_rx,
            cancel,
            generation,
        ));
        *self.task.lock() = Some(handle);
        
        let result = match self.config.login_timeout {
            Some(limit) => match timeout(limit, rx).await {
                Ok(received) => received.unwrap_or(Err(Error::Cancelled)),
                Err(_) => Err(Error::Timeout {
                    operation: "login",
                    after: limit,
                }),
            },
            None => rx.await.unwrap_or(Err(Error::Cancelled)),
        };
        
        match result {
            Ok(()) => {
                info!("Logged in to {}", self.remote_addr());
                Ok(())
            }
            Err(e) => {
                warn!("Login to {} failed: {}", self.remote_addr(), e);
                if !e.is_cancelled() {
                    self.disconnect().await?;
                }
                Err(e)
            }
        }
    }
    
    /// Run one command and return its response lines
    ///
    /// The echo, the blank separator and the prompt are stripped.
    ///
    /// # Errors
    ///
    /// - `NotReady` unless logged in with no command outstanding
    /// - `MalformedResponse` if the reader's reply is too short to frame
    /// - `Connection` if the socket fails while waiting, or failed earlier
    /// - `Timeout` if the command timeout elapses (the channel is torn down)
    /// - `Cancelled` if `disconnect` is called meanwhile
    pub async fn run_command(&self, command: &str) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        
        {
            let mut shared = self.shared.lock();
            let state = shared.session.state();
            
            // Link lost: report it as such, whatever the session was doing
            let outbound = match shared.outbound.clone() {
                Some(outbound) => outbound,
                None if state == ConnectionState::Disconnected => {
                    return Err(alienlink_core::Error::NotReady { state }.into());
                }
                None => return Err(alienlink_transport::Error::ConnectionClosed.into()),
            };
            if state != ConnectionState::Ready {
                return Err(alienlink_core::Error::NotReady { state }.into());
            }
            
            let data = shared.session.begin_command(command)?;
            shared.pending = Some(Pending::Command(tx));
            
            if outbound.send(data).is_err() {
                // Only possible once the I/O task is gone, which also fails pending
                return Err(alienlink_transport::Error::ConnectionClosed.into());
            }
        }
        
        let result = match self.config.command_timeout {
            Some(limit) => match timeout(limit, rx).await {
                Ok(received) => received.unwrap_or(Err(Error::Cancelled)),
                Err(_) => {
                    warn!(command, "No prompt after {:?}, dropping connection", limit);
                    self.disconnect().await?;
                    return Err(Error::Timeout {
                        operation: "command",
                        after: limit,
                    });
                }
            },
            None => rx.await.unwrap_or(Err(Error::Cancelled)),
        };
        
        match &result {
            Ok(lines) => debug!(command, lines = lines.len(), "Command succeeded"),
            Err(e) => debug!(command, "Command failed: {}", e),
        }
        result
    }
    
    /// Close the connection
    ///
    /// Any request in flight is released with `Cancelled`. Calling this on
    /// a disconnected channel does nothing.
    pub async fn disconnect(&self) -> Result<()> {
        let (pending, cancel, was_connected) = {
            let mut shared = self.shared.lock();
            let was_connected = shared.session.state() != ConnectionState::Disconnected;
            shared.session.reset();
            shared.outbound = None;
            shared.local_addr = None;
            (shared.pending.take(), shared.cancel.take(), was_connected)
        };
        
        if let Some(pending) = pending {
            debug!("Releasing pending request");
            pending.fail(Error::Cancelled);
        }
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Control I/O task ended abnormally: {}", e);
            }
        }
        
        if was_connected {
            info!("Disconnected from {}", self.remote_addr());
        }
        Ok(())
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.lock().cancel.take() {
            warn!("Control channel dropped while still connected");
            cancel.cancel();
        }
    }
}

/// Socket loop: reads feed the session, session output and commands get written
async fn io_loop(
    mut transport: Box<dyn Transport>,
    shared: Arc<Mutex<Shared>>,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
    generation: u64,
) {
    let failure = 'io: loop {
        tokio::select! {
            biased;
            
            _ = cancel.cancelled() => break 'io None,
            
            Some(data) = outbound.recv() => {
                if let Err(e) = transport.send(&data).await {
                    break 'io Some(e);
                }
            }
            
            received = transport.receive() => {
                let chunk = match received {
                    Ok(chunk) => chunk,
                    Err(e) => break 'io Some(e),
                };
                
                for data in apply_chunk(&shared, &chunk) {
                    if let Err(e) = transport.send(&data).await {
                        break 'io Some(e);
                    }
                }
            }
        }
    };
    
    if let Some(error) = failure {
        let (pending, state) = {
            let mut shared = shared.lock();
            let state = shared.session.state();
            if shared.generation == generation {
                shared.outbound = None;
                (shared.pending.take(), state)
            } else {
                (None, state)
            }
        };
        
        match pending {
            Some(pending) if state.is_logging_in() => {
                warn!(?state, "Control connection failed during login: {}", error);
                pending.fail(error.into());
            }
            Some(pending) => {
                warn!(?state, "Control connection failed: {}", error);
                pending.fail(error.into());
            }
            None => warn!("Control connection failed with no request pending: {}", error),
        }
    }
    
    let _ = transport.disconnect().await;
    trace!(generation, "Control I/O task finished");
}

/// Feed a chunk to the session, resolve completions, return bytes to write
fn apply_chunk(shared: &Mutex<Shared>, chunk: &[u8]) -> Vec<Bytes> {
    let mut shared = shared.lock();
    let mut writes = Vec::new();
    
    for action in shared.session.feed(chunk) {
        match action {
            Action::Send(data) => writes.push(data),
            Action::LoginComplete => match shared.pending.take() {
                Some(Pending::Login(tx)) => {
                    let _ = tx.send(Ok(()));
                }
                other => {
                    warn!("Login completed with no connect waiting");
                    shared.pending = other;
                }
            },
            Action::CommandComplete(result) => match shared.pending.take() {
                Some(Pending::Command(tx)) => {
                    let _ = tx.send(result.map_err(Error::from));
                }
                other => {
                    warn!("Command completed with no caller waiting");
                    shared.pending = other;
                }
            },
        }
    }
    
    writes
}
