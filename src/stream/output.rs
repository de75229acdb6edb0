use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Kind of a host output event, as reported by the host's command output
/// callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Info,
    Warning,
    Error,
    Result,
}

impl OutputKind {
    /// Decorate `msg` the way the host's script editor prints it.
    pub fn format(self, msg: &str) -> String {
        match self {
            Self::Info => msg.to_string(),
            Self::Warning => format!("# Warning: {msg} #\n"),
            Self::Error => format!("// Error: {msg} //\n"),
            Self::Result => format!("# Result: {msg} #\n"),
        }
    }
}

/// One received datagram, exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub source: SocketAddr,
    pub data: Vec<u8>,
}

impl Fragment {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Events delivered from the stream listener to its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    Listening { endpoint: SocketAddr },
    Output(Fragment),
    /// The listener session ended. `error` is set when a receive failed.
    Closed { error: Option<String> },
}
