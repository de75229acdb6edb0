//! Editor-facing entry point tying command delivery and output streaming
//! together.

use tokio::sync::mpsc;

use crate::{
    command::{CommandSender, RemoteCommands},
    config::Config,
    error::Result,
    stream::{StreamController, StreamEvent},
};

/// Capacity of the listener → consumer channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns the streaming session and forwards scripts to the host.
///
/// Stream events are delivered through the receiver returned by
/// [`Connector::new`], so consumers handle them on their own task rather than
/// on the listener's.
pub struct Connector {
    sender: CommandSender,
    stream: StreamController,
}

impl Connector {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sender = CommandSender::from_config(config);
        let stream = StreamController::new(
            sender.clone(),
            RemoteCommands::new(config.streamer_path.clone()),
            config.stream_endpoint,
            config.recv_buffer_size,
            tx,
        );
        (Self { sender, stream }, rx)
    }

    /// Start receiving the host's output.
    pub async fn connect(&mut self) -> Result<()> {
        self.stream.start().await
    }

    /// Stop receiving the host's output.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.stream.stop().await
    }

    /// Send a script for the host to evaluate. Works whether or not output is
    /// being streamed.
    pub async fn execute(&self, script: &str) -> Result<()> {
        self.sender.send(script).await
    }

    /// Teardown hook: always disconnects so no listener outlives its owner.
    pub async fn cleanup(&mut self) -> Result<()> {
        self.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_running()
    }

    pub fn stream(&self) -> &StreamController {
        &self.stream
    }

    pub const fn sender(&self) -> &CommandSender {
        &self.sender
    }
}
