//! Relay configuration: endpoints, invocation syntax and transport limits.
//!
//! Values come from a TOML file (`--config` or the per-user default location)
//! and are then overridden by command line flags.

use std::{
    fs,
    io::ErrorKind,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    stream::MAX_CHUNK_SIZE,
};

/// Port the host application's command port listens on.
pub const DEFAULT_COMMAND_PORT: u16 = 5050;
/// Port the local stream listener binds.
pub const DEFAULT_STREAM_PORT: u16 = 5051;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the host accepts one-shot command connections.
    pub command_endpoint: SocketAddr,
    /// Where the listener receives streamed output datagrams.
    pub stream_endpoint: SocketAddr,
    /// Host function that evaluates the wrapped script, e.g. `python`.
    pub invocation: String,
    /// Directory appended to the host's module search path before the
    /// streamer module is imported.
    pub streamer_path: Option<String>,
    pub connect_timeout_ms: u64,
    /// Receive buffer per datagram. Anything smaller than the emitter's chunk
    /// size truncates fragments.
    pub recv_buffer_size: usize,
    pub max_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_endpoint: SocketAddr::new(LOCALHOST, DEFAULT_COMMAND_PORT),
            stream_endpoint: SocketAddr::new(LOCALHOST, DEFAULT_STREAM_PORT),
            invocation: "python".to_string(),
            streamer_path: None,
            connect_timeout_ms: 2000,
            recv_buffer_size: 64 * 1024,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }
}

/// Default config file location: `<config dir>/script-relay/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("script-relay").join("config.toml"))
}

impl Config {
    /// Load the config from `path`, or from the default location when `path`
    /// is `None`. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::parse(&text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self> {
        if self.invocation.trim().is_empty() {
            return Err(Error::Config("invocation must not be empty".to_string()));
        }
        if self.recv_buffer_size == 0 {
            return Err(Error::Config("recv_buffer_size must be positive".to_string()));
        }
        self.max_chunk_size = self.max_chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Ok(self)
    }

    /// Point the command endpoint at another machine, keeping its port.
    pub fn set_host(&mut self, host: IpAddr) {
        self.command_endpoint.set_ip(host);
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
