//! Reader command definitions

use std::fmt;

use crate::constants::formats;

/// Commands understood by the reader's control channel
///
/// [`fmt::Display`] renders the exact wire text, without terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // Identity and antennas
    ReaderName(String),
    AntennaSequence(String),
    
    // Notification routing
    NotifyAddress { host: String, port: u16 },
    NotifyMode(bool),
    NotifyTrigger(&'static str),
    NotifyFormat(&'static str),
    
    // Tag list
    AcquireMode(&'static str),
    TagListAntennaCombine(bool),
    TagListCustomFormat(&'static str),
    
    // Autonomous mode
    AutoModeReset,
    AutoStopTimer(u64),
    AutoAction(&'static str),
    AutoStartTrigger(u32, u32),
    AutoStartPause(u64),
    AutoMode(bool),
    
    /// Anything else, sent verbatim
    Raw(String),
}

impl Command {
    /// Fixed part of the setup sequence
    ///
    /// Order matters: `AutoMode=on` starts the configured pipeline and must
    /// come last.
    pub fn static_setup(auto_stop_timer_ms: u64, tag_timestamps: bool) -> Vec<Command> {
        let format = if tag_timestamps {
            formats::TAG_LIST_TIMESTAMPED
        } else {
            formats::TAG_LIST
        };
        
        vec![
            Self::AcquireMode("Inventory"),
            Self::TagListAntennaCombine(false),
            Self::NotifyMode(true),
            Self::NotifyTrigger("TrueFalse"),
            Self::TagListCustomFormat(format),
            Self::NotifyFormat("Custom"),
            Self::AutoModeReset,
            Self::AutoStopTimer(auto_stop_timer_ms),
            Self::AutoAction("Acquire"),
            Self::AutoStartTrigger(0, 0),
            Self::AutoStartPause(0),
            Self::AutoMode(true),
        ]
    }
    
    /// Attribute name, as used by the reader
    pub fn name(&self) -> &str {
        match self {
            Self::ReaderName(_) => "ReaderName",
            Self::AntennaSequence(_) => "AntennaSequence",
            Self::NotifyAddress { .. } => "NotifyAddress",
            Self::NotifyMode(_) => "NotifyMode",
            Self::NotifyTrigger(_) => "NotifyTrigger",
            Self::NotifyFormat(_) => "NotifyFormat",
            Self::AcquireMode(_) => "AcquireMode",
            Self::TagListAntennaCombine(_) => "TagListAntennaCombine",
            Self::TagListCustomFormat(_) => "TagListCustomFormat",
            Self::AutoModeReset => "AutoModeReset",
            Self::AutoStopTimer(_) => "AutoStopTimer",
            Self::AutoAction(_) => "AutoAction",
            Self::AutoStartTrigger(..) => "AutoStartTrigger",
            Self::AutoStartPause(_) => "AutoStartPause",
            Self::AutoMode(_) => "AutoMode",
            Self::Raw(raw) => raw.split('=').next().unwrap_or(raw),
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Self::ReaderName(value) | Self::AntennaSequence(value) => write!(f, "{}={}", name, value),
            Self::NotifyAddress { host, port } => {
                if host.contains(':') {
                    write!(f, "{}=[{}]:{}", name, host, port)
                } else {
                    write!(f, "{}={}:{}", name, host, port)
                }
            }
            Self::NotifyMode(flag) | Self::TagListAntennaCombine(flag) | Self::AutoMode(flag) => {
                write!(f, "{}={}", name, on_off(*flag))
            }
            Self::NotifyTrigger(value)
            | Self::NotifyFormat(value)
            | Self::AcquireMode(value)
            | Self::TagListCustomFormat(value)
            | Self::AutoAction(value) => write!(f, "{}={}", name, value),
            Self::AutoModeReset => f.write_str(name),
            Self::AutoStopTimer(ms) => write!(f, "{}={}", name, ms),
            Self::AutoStartTrigger(rising, falling) => write!(f, "{}={} {}", name, rising, falling),
            Self::AutoStartPause(ms) => write!(f, "{}={}", name, ms),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for Command {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Command {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    
    #[test]
    fn test_static_setup_wire_text() {
        let wire: Vec<String> = Command::static_setup(1500, false)
            .iter()
            .map(ToString::to_string)
            .collect();
        
        assert_eq!(
            wire,
            vec![
                "AcquireMode=Inventory",
                "TagListAntennaCombine=off",
                "NotifyMode=on",
                "NotifyTrigger=TrueFalse",
                "TagListCustomFormat=%N,%A,%k,%m",
                "NotifyFormat=Custom",
                "AutoModeReset",
                "AutoStopTimer=1500",
                "AutoAction=Acquire",
                "AutoStartTrigger=0 0",
                "AutoStartPause=0",
                "AutoMode=on",
            ]
        );
    }
    
    #[test]
    fn test_static_setup_timestamped_format() {
        let commands = Command::static_setup(1000, true);
        assert!(commands.contains(&Command::TagListCustomFormat(formats::TAG_LIST_TIMESTAMPED)));
        assert_eq!(commands.last(), Some(&Command::AutoMode(true)));
    }
    
    #[test]
    fn test_variable_commands() {
        assert_eq!(Command::ReaderName("dock-3".into()).to_string(), "ReaderName=dock-3");
        assert_eq!(Command::AntennaSequence("0 1".into()).to_string(), "AntennaSequence=0 1");
        assert_eq!(
            Command::NotifyAddress { host: "192.168.1.10".into(), port: 20001 }.to_string(),
            "NotifyAddress=192.168.1.10:20001"
        );
    }
    
    #[test]
    fn test_raw_command() {
        let cmd = Command::from("get ReaderVersion");
        assert_eq!(cmd.to_string(), "get ReaderVersion");
        assert_eq!(Command::from("AutoMode=off").name(), "AutoMode");
    }
}
