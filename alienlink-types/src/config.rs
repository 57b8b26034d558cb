//! Reader connection configuration
//!
//! Every field has a default so a config can be built from nothing, from
//! `ALIEN_*` environment variables, or field by field with the `with_*`
//! builder methods.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default reader host
pub const DEFAULT_HOST: &str = "localhost";

/// Default control port
pub const DEFAULT_PORT: u16 = 20000;

/// Default notification port
pub const DEFAULT_NOTIFY_PORT: u16 = 20001;

/// Default login username
pub const DEFAULT_USERNAME: &str = "alien";

/// Default login password
pub const DEFAULT_PASSWORD: &str = "password";

/// Default reader name assigned during setup
pub const DEFAULT_READER_NAME: &str = "alienlink";

/// Default `AutoStopTimer` value in milliseconds
pub const DEFAULT_AUTO_STOP_TIMER_MS: u64 = 1000;

/// Configuration consumed by the control channel, the setup sequence and
/// the notification listener.
#[derive(Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Reader host name or IP address
    pub address: String,
    
    /// Control (telnet-style) port
    pub port: u16,
    
    /// Login username
    pub username: String,
    
    /// Login password
    pub password: String,
    
    /// Name assigned with `ReaderName=`
    pub reader_name: String,
    
    /// Antenna identifiers, in sequence order
    pub antennas: Vec<String>,
    
    /// Local interface the notification listener binds to
    pub notify_bind: String,
    
    /// Notification port (0 picks an ephemeral port)
    pub notify_port: u16,
    
    /// `AutoStopTimer` value in milliseconds
    pub auto_stop_timer_ms: u64,
    
    /// Ask the reader to append a timestamp to every tag line
    pub tag_timestamps: bool,
    
    /// TCP connect timeout
    pub connect_timeout: Option<Duration>,
    
    /// Timeout for the whole login handshake
    pub login_timeout: Option<Duration>,
    
    /// Timeout for a single command
    pub command_timeout: Option<Duration>,
}

impl ReaderConfig {
    /// Create a config for the given reader address with defaults elsewhere
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Self::default()
        }
    }
    
    /// Set login credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }
    
    /// Set reader name
    pub fn with_reader_name(mut self, name: impl Into<String>) -> Self {
        self.reader_name = name.into();
        self
    }
    
    /// Set antenna sequence
    pub fn with_antennas<I, S>(mut self, antennas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.antennas = antennas.into_iter().map(Into::into).collect();
        self
    }
    
    /// Set notification listener bind address and port
    pub fn with_notify(mut self, bind: impl Into<String>, port: u16) -> Self {
        self.notify_bind = bind.into();
        self.notify_port = port;
        self
    }
    
    /// Set `AutoStopTimer` in milliseconds
    pub fn with_auto_stop_timer(mut self, ms: u64) -> Self {
        self.auto_stop_timer_ms = ms;
        self
    }
    
    /// Enable timestamped tag lines
    pub fn with_tag_timestamps(mut self, enabled: bool) -> Self {
        self.tag_timestamps = enabled;
        self
    }
    
    /// Set TCP connect timeout
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
    
    /// Set login handshake timeout
    pub fn with_login_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.login_timeout = timeout;
        self
    }
    
    /// Set per-command timeout
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }
    
    /// Space-joined antenna list as sent in `AntennaSequence=`
    pub fn antenna_sequence(&self) -> String {
        self.antennas.join(" ")
    }
    
    /// Build a config from `ALIEN_*` environment variables
    ///
    /// Recognised variables: `ALIEN_HOST`, `ALIEN_PORT`, `ALIEN_USERNAME`,
    /// `ALIEN_PASSWORD`, `ALIEN_READER_NAME`, `ALIEN_ANTENNAS` (comma or
    /// space separated), `ALIEN_NOTIFY_BIND`, `ALIEN_NOTIFY_PORT`,
    /// `ALIEN_AUTO_STOP_TIMER_MS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
    
    /// Build a config from an arbitrary key lookup (same keys as [`Self::from_env`])
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        
        if let Some(host) = lookup("ALIEN_HOST") {
            config.address = host;
        }
        if let Some(port) = lookup("ALIEN_PORT") {
            config.port = parse_number("ALIEN_PORT", &port)?;
        }
        if let Some(username) = lookup("ALIEN_USERNAME") {
            config.username = username;
        }
        if let Some(password) = lookup("ALIEN_PASSWORD") {
            config.password = password;
        }
        if let Some(name) = lookup("ALIEN_READER_NAME") {
            config.reader_name = name;
        }
        if let Some(antennas) = lookup("ALIEN_ANTENNAS") {
            config.antennas = antennas
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(bind) = lookup("ALIEN_NOTIFY_BIND") {
            config.notify_bind = bind;
        }
        if let Some(port) = lookup("ALIEN_NOTIFY_PORT") {
            config.notify_port = parse_number("ALIEN_NOTIFY_PORT", &port)?;
        }
        if let Some(ms) = lookup("ALIEN_AUTO_STOP_TIMER_MS") {
            config.auto_stop_timer_ms = parse_number("ALIEN_AUTO_STOP_TIMER_MS", &ms)?;
        }
        
        config.validate()?;
        Ok(config)
    }
    
    /// Check the config can be sent to a reader as-is
    ///
    /// Values end up inside single protocol lines, so line breaks are rejected.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Validation("address is empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Validation("control port must not be 0".into()));
        }
        if self.username.is_empty() {
            return Err(Error::Validation("username is empty".into()));
        }
        if self.reader_name.trim().is_empty() {
            return Err(Error::Validation("reader name is empty".into()));
        }
        if self.antennas.is_empty() {
            return Err(Error::Validation("antenna list is empty".into()));
        }
        if let Some(bad) = self
            .antennas
            .iter()
            .find(|a| a.is_empty() || a.chars().any(char::is_whitespace))
        {
            return Err(Error::Validation(format!("invalid antenna identifier: {:?}", bad)));
        }
        
        for (field, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("reader name", &self.reader_name),
        ] {
            if value.contains(['\r', '\n']) {
                return Err(Error::Validation(format!("{} contains a line break", field)));
            }
        }
        
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("{}: not a valid number: {:?}", key, value)))
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            reader_name: DEFAULT_READER_NAME.to_string(),
            antennas: vec!["0".to_string()],
            notify_bind: "0.0.0.0".to_string(),
            notify_port: DEFAULT_NOTIFY_PORT,
            auto_stop_timer_ms: DEFAULT_AUTO_STOP_TIMER_MS,
            tag_timestamps: false,
            connect_timeout: Some(Duration::from_secs(5)),
            login_timeout: Some(Duration::from_secs(10)),
            command_timeout: Some(Duration::from_secs(10)),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("reader_name", &self.reader_name)
            .field("antennas", &self.antennas)
            .field("notify_bind", &self.notify_bind)
            .field("notify_port", &self.notify_port)
            .field("auto_stop_timer_ms", &self.auto_stop_timer_ms)
            .field("tag_timestamps", &self.tag_timestamps)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reader[{}@{}:{}]", self.username, self.address, self.port)
    }
}
