//! Simulated host application.
//!
//! Accepts scripts on a command port the way the real application does and
//! streams output back through a [`ChunkedEmitter`]. Scripts are not
//! evaluated: each one is echoed as a result event. The begin/stop streaming
//! scripts switch the stream target.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
    sync::broadcast,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
    command::{is_stop_stream, parse_begin_stream, InvocationCodec},
    config::Config,
    error::{Error, Result},
    stream::{ChunkedEmitter, EmitReport, OutputKind},
};

/// Upper bound on one command payload.
const MAX_COMMAND_SIZE: u64 = 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A payload received on the command port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    /// Bytes exactly as received.
    pub raw: String,
    /// Decoded script, or `None` when the payload was malformed.
    pub script: Option<String>,
}

pub struct HostServer {
    listener: TcpListener,
    codec: InvocationCodec,
    emitter: ChunkedEmitter<UdpSocket>,
    target: Mutex<Option<SocketAddr>>,
    events: broadcast::Sender<HostEvent>,
}

impl HostServer {
    pub async fn bind(endpoint: SocketAddr, config: &Config) -> Result<Self> {
        let listener = TcpListener::bind(endpoint)
            .await
            .map_err(|source| Error::Bind { endpoint, source })?;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            listener,
            codec: InvocationCodec::new(config.invocation.clone()),
            emitter: ChunkedEmitter::with_max_chunk_size(socket, config.max_chunk_size),
            target: Mutex::new(None),
            events,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Where output is currently streamed, if anywhere.
    pub fn stream_target(&self) -> Option<SocketAddr> {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_stream_target(&self, target: Option<SocketAddr>) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = target;
    }

    /// Send an output event to the stream target. `Ok(None)` when nobody is
    /// listening.
    pub fn emit(&self, kind: OutputKind, message: &str) -> Result<Option<EmitReport>> {
        let Some(target) = self.stream_target() else {
            return Ok(None);
        };
        let report = self.emitter.emit(kind.format(message).as_bytes(), target)?;
        tracing::debug!(
            "Emitted {} bytes in {} datagram(s) to {target}",
            report.bytes,
            report.datagrams
        );
        Ok(Some(report))
    }

    /// Accept command connections until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        tracing::info!("Host accepting commands on {}", self.local_addr()?);
        loop {
            let accepted = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("Command connection from {peer}");
                    if let Err(e) = self.handle_connection(stream).await {
                        tracing::warn!("Dropped command from {peer}: {e}");
                    }
                }
                Err(e) => tracing::error!("Accept error: {e}"),
            }
        }
        tracing::info!("Host stopped");
        Ok(())
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let mut raw = Vec::new();
        let mut reader = stream.take(MAX_COMMAND_SIZE);
        timeout(READ_TIMEOUT, reader.read_to_end(&mut raw))
            .await
            .map_err(|_| Error::Io(io::ErrorKind::TimedOut.into()))??;

        let raw = String::from_utf8_lossy(&raw).into_owned();
        let script = match self.codec.unwrap(&raw) {
            Ok(script) => Some(script),
            Err(e) => {
                tracing::warn!("Malformed command: {e}");
                None
            }
        };
        let _ = self.events.send(HostEvent {
            raw,
            script: script.clone(),
        });

        match script {
            Some(script) => self.evaluate(&script),
            None => Ok(()),
        }
    }

    fn evaluate(&self, script: &str) -> Result<()> {
        if let Some(target) = parse_begin_stream(script) {
            tracing::info!("Streaming output to {target}");
            self.set_stream_target(Some(target));
            return Ok(());
        }
        if is_stop_stream(script) {
            tracing::info!("Streaming disabled");
            self.set_stream_target(None);
            return Ok(());
        }
        self.emit(OutputKind::Result, script).map(|_| ())
    }
}
