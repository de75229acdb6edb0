//! One-shot command delivery to the host's command port.

use std::{io, net::SocketAddr, time::Duration};

use tokio::{io::AsyncWriteExt, net::TcpStream, time::timeout};

use super::codec::InvocationCodec;
use crate::{
    config::Config,
    error::{Error, Result},
};

/// Sends each script over its own TCP connection. Fire-and-forget: the host
/// never answers on the command connection.
#[derive(Debug, Clone)]
pub struct CommandSender {
    endpoint: SocketAddr,
    codec: InvocationCodec,
    connect_timeout: Duration,
}

impl CommandSender {
    pub fn new(endpoint: SocketAddr, codec: InvocationCodec, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            codec,
            connect_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.command_endpoint,
            InvocationCodec::new(config.invocation.clone()),
            config.connect_timeout(),
        )
    }

    pub const fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub const fn codec(&self) -> &InvocationCodec {
        &self.codec
    }

    /// Wrap `script` and deliver it. Not retried on failure.
    pub async fn send(&self, script: &str) -> Result<()> {
        let payload = self.codec.wrap(script);
        let mut stream = self.open().await?;

        stream.write_all(payload.as_bytes()).await?;
        stream.shutdown().await?;

        tracing::debug!("Sent {} bytes to {}", payload.len(), self.endpoint);
        Ok(())
    }

    async fn open(&self) -> Result<TcpStream> {
        let connect = TcpStream::connect(self.endpoint);
        match timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(Error::Connection {
                endpoint: self.endpoint,
                source,
            }),
            Err(_) => Err(Error::Connection {
                endpoint: self.endpoint,
                source: io::ErrorKind::TimedOut.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncReadExt, net::TcpListener};

    use super::*;

    fn sender(endpoint: SocketAddr) -> CommandSender {
        CommandSender::new(
            endpoint,
            InvocationCodec::new("invoke"),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_sends_wrapped_payload_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            stream.read_to_string(&mut received).await.unwrap();
            received
        });

        sender(endpoint).send(r#"print("hi")"#).await.unwrap();
        assert_eq!(accept.await.unwrap(), r#"invoke("print(\"hi\")")"#);
    }

    #[tokio::test]
    async fn test_each_send_opens_new_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let mut payloads = Vec::new();
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut received = String::new();
                stream.read_to_string(&mut received).await.unwrap();
                payloads.push(received);
            }
            payloads
        });

        let sender = sender(endpoint);
        sender.send("a = 1").await.unwrap();
        sender.send("b = 2").await.unwrap();
        assert_eq!(
            accept.await.unwrap(),
            vec!["invoke(\"a = 1\")", "invoke(\"b = 2\")"]
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        // Bind and drop to get a port with nothing listening.
        let endpoint = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let err = sender(endpoint).send("x").await.unwrap_err();
        assert!(matches!(err, Error::Connection { endpoint: e, .. } if e == endpoint));
    }
}
