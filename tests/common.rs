#![allow(dead_code)]

use std::{
    net::{SocketAddr, UdpSocket},
    sync::Arc,
    time::Duration,
};

use script_relay::{
    config::Config,
    host::{HostEvent, HostServer},
    stream::StreamEvent,
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

pub const WAIT: Duration = Duration::from_secs(5);

/// A simulated host on ephemeral ports, plus a client config pointing at it.
pub struct HostHarness {
    pub host: Arc<HostServer>,
    pub config: Config,
    pub commands: broadcast::Receiver<HostEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<script_relay::Result<()>>>,
}

impl HostHarness {
    pub async fn spawn() -> Self {
        let mut config = Config {
            invocation: "invoke".to_string(),
            connect_timeout_ms: 1000,
            stream_endpoint: free_udp_endpoint(),
            ..Config::default()
        };
        let host = HostServer::bind("127.0.0.1:0".parse().unwrap(), &config)
            .await
            .expect("Failed to bind host");
        config.command_endpoint = host.local_addr().unwrap();

        let host = Arc::new(host);
        let commands = host.subscribe();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&host).run(cancel.clone()));

        Self {
            host,
            config,
            commands,
            cancel,
            task: Some(task),
        }
    }

    /// Next payload the host received on its command port.
    pub async fn next_command(&mut self) -> HostEvent {
        timeout(WAIT, self.commands.recv())
            .await
            .expect("Timed out waiting for a command")
            .expect("Host event channel closed")
    }

    /// Wait until the host streams to `expected` (or stops, for `None`).
    pub async fn wait_for_target(&self, expected: Option<SocketAddr>) {
        timeout(WAIT, async {
            while self.host.stream_target() != expected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Host never switched stream target");
    }

    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HostHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Reserve a UDP port on loopback and release it again.
pub fn free_udp_endpoint() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to reserve port");
    socket.local_addr().unwrap()
}

/// A loopback TCP endpoint nobody listens on.
pub fn closed_tcp_endpoint() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Receive stream events until `len` bytes of output arrived.
pub async fn collect_output(events: &mut mpsc::Receiver<StreamEvent>, len: usize) -> Vec<Vec<u8>> {
    let mut fragments = Vec::new();
    let mut total = 0;
    while total < len {
        let event = timeout(WAIT, events.recv())
            .await
            .expect("Timed out waiting for output")
            .expect("Stream channel closed");
        if let StreamEvent::Output(fragment) = event {
            total += fragment.data.len();
            fragments.push(fragment.data);
        }
    }
    fragments
}
