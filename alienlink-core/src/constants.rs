//! Protocol constants

/// Prompt sent by the reader when it wants the username
pub const USERNAME_PROMPT: &str = "Username>";

/// Prompt sent by the reader when it wants the password
pub const PASSWORD_PROMPT: &str = "Password>";

/// Command prompt; marks the end of every response
pub const COMMAND_PROMPT: &str = "Alien>";

/// Terminator for login replies
pub const LOGIN_TERMINATOR: &str = "\n";

/// Terminator for commands
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Default control port
pub const DEFAULT_CONTROL_PORT: u16 = 20000;

/// Default notification port
pub const DEFAULT_NOTIFY_PORT: u16 = 20001;

/// Longest unterminated tail the framer keeps before discarding it
pub const MAX_PARTIAL_LINE: usize = 16 * 1024;

/// Bytes of a discarded tail kept so a marker at its end is still seen
pub const MARKER_WINDOW: usize = 64;

/// Notification line filter
pub mod notify {
    /// Lines starting with this are comments
    pub const COMMENT_PREFIX: char = '#';
    
    /// Notification header/footer marker
    pub const HEADER_MARKER: &str = "#Alien";
    
    /// Sent when a read cycle saw nothing
    pub const NO_TAGS: &str = "No Tags";
    
    /// Lines must be longer than this (in characters) to be kept
    pub const MIN_LINE_LEN: usize = 3;
}

/// Tag list formats used with `TagListCustomFormat=`
pub mod formats {
    /// Name, antenna, tag id, RSSI
    pub const TAG_LIST: &str = "%N,%A,%k,%m";
    
    /// [`TAG_LIST`] plus last-seen time in epoch milliseconds
    pub const TAG_LIST_TIMESTAMPED: &str = "%N,%A,%k,%m,${MSEC2}";
}
