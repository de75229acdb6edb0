//! Background receiver for the host's output datagrams.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{net::UdpSocket, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::output::{Fragment, StreamEvent};
use crate::error::{Error, Result};

/// A bound stream endpoint, ready to be moved into its receive task.
/// Each activation binds a fresh socket; dropping the listener releases it.
pub struct StreamListener {
    socket: UdpSocket,
    endpoint: SocketAddr,
    buffer_size: usize,
}

impl StreamListener {
    pub async fn bind(endpoint: SocketAddr, buffer_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(endpoint)
            .await
            .map_err(|source| Error::Bind { endpoint, source })?;
        let endpoint = socket.local_addr()?;
        Ok(Self {
            socket,
            endpoint,
            buffer_size,
        })
    }

    /// Address actually bound (resolves port 0).
    pub const fn local_addr(&self) -> SocketAddr {
        self.endpoint
    }

    /// Run the receive loop on a background task.
    ///
    /// The loop ends when `running` is cleared, `cancel` fires, the consumer
    /// drops its receiver, or a receive fails.
    pub fn spawn(
        self,
        running: Arc<AtomicBool>,
        cancel: CancellationToken,
        events: mpsc::Sender<StreamEvent>,
    ) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(running, cancel, events))
    }

    async fn run(
        self,
        running: Arc<AtomicBool>,
        cancel: CancellationToken,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        tracing::info!("Listening for output on {}", self.endpoint);
        let listening = StreamEvent::Listening {
            endpoint: self.endpoint,
        };
        let announced = forward(&events, &cancel, listening).await;

        let mut buf = vec![0u8; self.buffer_size];
        let result = loop {
            if !announced || !running.load(Ordering::Acquire) {
                break Ok(());
            }

            let received = tokio::select! {
                biased;
                () = cancel.cancelled() => break Ok(()),
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, source)) => {
                    tracing::trace!("Received {len} bytes from {source}");
                    let fragment = Fragment {
                        source,
                        data: buf[..len].to_vec(),
                    };
                    if !forward(&events, &cancel, StreamEvent::Output(fragment)).await {
                        break Ok(());
                    }
                }
                Err(e) => {
                    tracing::error!("Receive on {} failed: {e}", self.endpoint);
                    break Err(Error::Io(e));
                }
            }
        };

        let error = result.as_ref().err().map(ToString::to_string);
        // Best effort: the consumer may already be gone or full.
        let _ = events.try_send(StreamEvent::Closed { error });
        tracing::info!("Stopped listening on {}", self.endpoint);
        result
    }
}

/// Hand an event to the consumer. Returns `false` when the session should end.
async fn forward(
    events: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    event: StreamEvent,
) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}
