mod common;

use common::{closed_tcp_endpoint, collect_output, HostHarness};
use script_relay::{
    command::CommandSender,
    connector::Connector,
    error::Error,
    stream::{OutputKind, StreamEvent},
};

#[tokio::test]
async fn test_execute_sends_wrapped_script() {
    let mut harness = HostHarness::spawn().await;
    let (connector, _events) = Connector::new(&harness.config);

    connector.execute("print(\"hi\")").await.unwrap();

    let command = harness.next_command().await;
    assert_eq!(command.raw, r#"invoke("print(\"hi\")")"#);
    assert_eq!(command.script.as_deref(), Some("print(\"hi\")"));
    harness.shutdown().await;
}

#[tokio::test]
async fn test_multiline_script_survives_transfer() {
    let mut harness = HostHarness::spawn().await;
    let sender = CommandSender::from_config(&harness.config);
    let script = "for i in range(3):\n\tprint('a\\\\b', i)\r\n";

    sender.send(script).await.unwrap();

    let command = harness.next_command().await;
    assert!(!command.raw.contains('\n'));
    assert_eq!(command.script.as_deref(), Some(script));
    harness.shutdown().await;
}

#[tokio::test]
async fn test_execute_without_host_is_connection_error() {
    let mut harness = HostHarness::spawn().await;
    harness.config.command_endpoint = closed_tcp_endpoint();
    let (connector, _events) = Connector::new(&harness.config);

    let err = connector.execute("x = 1").await.unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_connect_points_host_at_listener() {
    let mut harness = HostHarness::spawn().await;
    let (mut connector, mut events) = Connector::new(&harness.config);

    connector.connect().await.unwrap();
    assert!(connector.is_connected());
    let addr = connector.stream().listen_addr().unwrap();
    assert_eq!(addr, harness.config.stream_endpoint);
    assert!(matches!(
        events.recv().await,
        Some(StreamEvent::Listening { endpoint }) if endpoint == addr
    ));
    harness.wait_for_target(Some(addr)).await;

    connector.disconnect().await.unwrap();
    assert!(!connector.is_connected());
    harness.wait_for_target(None).await;
    harness.shutdown().await;
}

#[tokio::test]
async fn test_executed_script_result_is_streamed_back() {
    let mut harness = HostHarness::spawn().await;
    let (mut connector, mut events) = Connector::new(&harness.config);
    connector.connect().await.unwrap();
    harness
        .wait_for_target(connector.stream().listen_addr())
        .await;

    connector.execute("1 + 1").await.unwrap();

    let expected = OutputKind::Result.format("1 + 1");
    let output = collect_output(&mut events, expected.len()).await.concat();
    assert_eq!(String::from_utf8(output).unwrap(), expected);

    connector.cleanup().await.unwrap();
    harness.shutdown().await;
}

#[tokio::test]
async fn test_large_output_arrives_in_ordered_chunks() {
    let mut harness = HostHarness::spawn().await;
    let (mut connector, mut events) = Connector::new(&harness.config);
    connector.connect().await.unwrap();
    harness
        .wait_for_target(connector.stream().listen_addr())
        .await;

    let message: String = (0..20_000u32)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect();
    let report = harness
        .host
        .emit(OutputKind::Info, &message)
        .unwrap()
        .expect("Host has a stream target");
    assert_eq!(report.datagrams, 3);
    assert_eq!(report.bytes, 20_000);

    let fragments = collect_output(&mut events, message.len()).await;
    let sizes: Vec<usize> = fragments.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![8192, 8192, 3616]);
    assert_eq!(fragments.concat(), message.as_bytes());

    connector.cleanup().await.unwrap();
    harness.shutdown().await;
}
