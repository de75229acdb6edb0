//! Relay scripts from an external editor to a running host application and
//! stream the host's output back.
//!
//! ```text
//! editor ──execute──► CommandSender ──TCP `fn("<script>")`──► host command port
//!    ▲                                                            │
//!    └── mpsc ◄── StreamListener ◄──UDP fragments── ChunkedEmitter┘
//! ```

pub mod command;
pub mod config;
pub mod connector;
pub mod error;
pub mod host;
pub mod stream;
pub mod tui;

pub use config::Config;
pub use connector::Connector;
pub use error::{Error, Result};
