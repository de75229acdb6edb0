//! Starts and stops a streaming session: the local listener plus the host's
//! forwarding of output events to it.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{listener::StreamListener, output::StreamEvent};
use crate::{
    command::{CommandSender, RemoteCommands},
    error::{Error, Result},
};

/// Handle to the listener task of the active session.
struct Session {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl Session {
    /// Cancel the receive loop and wait until its socket is released.
    async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Io(e.into())),
        }
    }
}

pub struct StreamController {
    sender: CommandSender,
    remote: RemoteCommands,
    endpoint: SocketAddr,
    buffer_size: usize,
    running: Arc<AtomicBool>,
    events: mpsc::Sender<StreamEvent>,
    session: Option<Session>,
}

impl StreamController {
    pub fn new(
        sender: CommandSender,
        remote: RemoteCommands,
        endpoint: SocketAddr,
        buffer_size: usize,
        events: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            sender,
            remote,
            endpoint,
            buffer_size,
            running: Arc::new(AtomicBool::new(false)),
            events,
            session: None,
        }
    }

    /// True while a listener task is alive. A session whose task already
    /// ended on its own does not count.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.live_session().is_some()
    }

    /// Address of the active listener, if any.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.live_session().map(|s| s.addr)
    }

    fn live_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| !s.task.is_finished())
    }

    /// Collect a session whose listener ended without `stop()`, after a
    /// receive error or a dropped consumer, so the next `start()` binds anew.
    async fn reap_finished(&mut self) {
        if !self.session.as_ref().is_some_and(|s| s.task.is_finished()) {
            return;
        }
        if let Some(session) = self.session.take() {
            if let Err(e) = session.shutdown().await {
                tracing::warn!("Previous listener ended with error: {e}");
            }
        }
        self.running.store(false, Ordering::Release);
    }

    /// Bind the listener, spawn its task, then ask the host to stream to it.
    /// A no-op while already running.
    pub async fn start(&mut self) -> Result<()> {
        self.reap_finished().await;
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Stream already running");
            return Ok(());
        }

        let listener = match StreamListener::bind(self.endpoint, self.buffer_size).await {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let addr = listener.local_addr();
        let cancel = CancellationToken::new();
        let task = listener.spawn(self.running.clone(), cancel.clone(), self.events.clone());
        self.session = Some(Session { addr, cancel, task });

        if let Err(e) = self.sender.send(&self.remote.begin_stream(addr)).await {
            tracing::warn!("Host did not accept begin-stream command: {e}");
            self.running.store(false, Ordering::Release);
            if let Some(session) = self.session.take() {
                let _ = session.shutdown().await;
            }
            return Err(e);
        }

        tracing::info!("Streaming host output to {addr}");
        Ok(())
    }

    /// Stop the listener and ask the host to stop streaming.
    /// A no-op while not running.
    pub async fn stop(&mut self) -> Result<()> {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        if let Some(session) = self.session.take() {
            if let Err(e) = session.shutdown().await {
                tracing::warn!("Listener ended with error: {e}");
            }
        }

        let result = self.sender.send(&self.remote.stop_stream()).await;
        tracing::info!("Stopped streaming host output");
        result
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}
