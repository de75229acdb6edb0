//! Scripts that switch the host's output streaming on and off.
//!
//! The host side runs a small `streamer` module which hooks the command
//! output callback and forwards every event to a UDP endpoint.

use std::net::{IpAddr, SocketAddr};

const OPEN_STREAM: &str = "streamer.open_stream((";
const CLOSE_STREAM: &str = "streamer.close_stream()";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommands {
    /// Directory the host must add to `sys.path` to import the streamer.
    streamer_path: Option<String>,
}

impl RemoteCommands {
    pub const fn new(streamer_path: Option<String>) -> Self {
        Self { streamer_path }
    }

    /// Ask the host to start forwarding output events to `target`.
    pub fn begin_stream(&self, target: SocketAddr) -> String {
        let import = self.streamer_path.as_ref().map_or_else(
            || "import streamer; ".to_string(),
            |path| {
                let path = quote_path(path);
                format!("import sys; sys.path.append('{path}'); import streamer; ")
            },
        );
        format!(
            "{import}{OPEN_STREAM}\"{}\", {}))",
            target.ip(),
            target.port()
        )
    }

    /// Ask the host to stop forwarding output events.
    pub fn stop_stream(&self) -> String {
        CLOSE_STREAM.to_string()
    }
}

/// Escape `path` for a single-quoted Python string literal.
fn quote_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Extract the target address from a `begin_stream` script.
pub fn parse_begin_stream(script: &str) -> Option<SocketAddr> {
    let start = script.find(OPEN_STREAM)? + OPEN_STREAM.len();
    let args = &script[start..];
    let args = &args[..args.find("))")?];

    let (host, port) = args.split_once(',')?;
    let host: IpAddr = host.trim().trim_matches(['"', '\'']).parse().ok()?;
    let port: u16 = port.trim().parse().ok()?;
    Some(SocketAddr::new(host, port))
}

pub fn is_stop_stream(script: &str) -> bool {
    script.trim().ends_with(CLOSE_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_stream_names_target() {
        let commands = RemoteCommands::default();
        let script = commands.begin_stream("127.0.0.1:5051".parse().unwrap());
        assert_eq!(
            script,
            "import streamer; streamer.open_stream((\"127.0.0.1\", 5051))"
        );
    }

    #[test]
    fn test_begin_stream_extends_search_path() {
        let commands = RemoteCommands::new(Some("/opt/relay".to_string()));
        let script = commands.begin_stream("127.0.0.1:5051".parse().unwrap());
        assert!(script.starts_with("import sys; sys.path.append('/opt/relay'); "));
        assert!(script.ends_with("streamer.open_stream((\"127.0.0.1\", 5051))"));
    }

    #[test]
    fn test_begin_stream_quotes_windows_path() {
        let commands = RemoteCommands::new(Some(r"C:\tools\bob's relay".to_string()));
        let script = commands.begin_stream("127.0.0.1:5051".parse().unwrap());
        assert!(script.starts_with(r"import sys; sys.path.append('C:\\tools\\bob\'s relay'); "));
    }

    #[test]
    fn test_parse_begin_stream_round_trip() {
        let target: SocketAddr = "10.1.2.3:40000".parse().unwrap();
        let script = RemoteCommands::new(Some("/x".to_string())).begin_stream(target);
        assert_eq!(parse_begin_stream(&script), Some(target));
    }

    #[test]
    fn test_parse_begin_stream_accepts_single_quotes() {
        assert_eq!(
            parse_begin_stream("streamer.open_stream(('127.0.0.1', 5051))"),
            Some("127.0.0.1:5051".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_begin_stream_rejects_other_scripts() {
        assert_eq!(parse_begin_stream("print('hi')"), None);
        assert_eq!(parse_begin_stream("streamer.open_stream((\"host\", 1))"), None);
        assert!(!is_stop_stream("print('hi')"));
        assert!(is_stop_stream(&RemoteCommands::default().stop_stream()));
    }
}
