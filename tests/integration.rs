// SPDX-License-Identifier: MIT

//! End-to-end scenarios driven over a real loopback `TcpStream`: bind on
//! port 0, drive the live server, assert on the wire replies.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use doorsim::config::SimConfig;
use doorsim::door::Simulator;
use doorsim::state::{FirmwareVersion, HardwareVersion};
use doorsim::transport::server;

fn test_config() -> SimConfig {
    SimConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        control_port: None,
        firmware: FirmwareVersion::default(),
        hardware: HardwareVersion::default(),
        rise_time: 0.05,
        slowing_time: 0.02,
        closing_top_time: 0.02,
        closing_mid_time: 0.02,
        hold_poll_interval: 0.01,
        charge_rate: 2.0,
        discharge_rate: 0.5,
        battery_update_interval: 60.0,
        max_frame_bytes: 65536,
    }
}

/// Spin up a live server on an ephemeral port and return the shared
/// simulator plus a ready-to-connect address.
async fn spawn_server() -> (Arc<Simulator>, std::net::SocketAddr, CancellationToken) {
    let config = test_config();
    let sim = Simulator::new(&config);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();

    tokio::spawn(server::serve_on(Arc::clone(&sim), listener, config.max_frame_bytes, shutdown.clone(), None));
    (sim, addr, shutdown)
}

async fn send(stream: &mut TcpStream, msg: &Value) {
    let mut line = msg.to_string();
    line.push('\n');
    stream.write_all(line.as_bytes()).await.expect("write request");
}

async fn recv_object(reader: &mut (impl AsyncBufReadExt + Unpin)) -> Value {
    loop {
        let mut buf = Vec::new();
        reader.read_until(b'}', &mut buf).await.expect("read reply");
        if let Ok(value) = serde_json::from_slice::<Value>(&buf) {
            return value;
        }
    }
}

#[tokio::test]
async fn ping_gets_pong() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(br#"{"PING":"abc"}"#).await.expect("write ping");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["CMD"], "PONG");
    assert_eq!(reply["PONG"], "abc");
}

#[tokio::test]
async fn basic_open_close_cycle_reaches_closed_again() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(br#"{"CMD":"OPEN"}"#).await.expect("write open");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["success"], "true");

    tokio::time::sleep(Duration::from_millis(300)).await;

    write_half.write_all(br#"{"CMD":"GET_DOOR_STATUS"}"#).await.expect("write status");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["status"], "CLOSED");
}

#[tokio::test]
async fn power_off_rejects_open_with_reason() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(br#"{"CMD":"POWER_OFF"}"#).await.expect("write power off");
    let _ = recv_object(&mut reader).await;

    write_half.write_all(br#"{"CMD":"OPEN","msgId":7}"#).await.expect("write open");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["success"], "false");
    assert_eq!(reply["msgId"], 7);
    assert!(reply["reason"].as_str().expect("reason string").contains("power"));
}

#[tokio::test]
async fn hold_time_round_trips_in_centiseconds() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    send(&mut write_half, &json!({"CMD": "SET_HOLD_TIME", "holdTime": 1250})).await;
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["success"], "true");
    assert_eq!(reply["holdTime"], 1250);

    send(&mut write_half, &json!({"CMD": "GET_HOLD_TIME"})).await;
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["holdTime"], 1250);
}

#[tokio::test]
async fn unknown_command_tag_fails_cleanly() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    send(&mut write_half, &json!({"CMD": "NOT_A_REAL_COMMAND"})).await;
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["success"], "false");
}

#[tokio::test]
async fn toggle_broadcast_reaches_a_second_connected_peer() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut actor = TcpStream::connect(addr).await.expect("connect actor");
    let mut observer = TcpStream::connect(addr).await.expect("connect observer");
    let (obs_read, _obs_write) = observer.split();
    let mut obs_reader = BufReader::new(obs_read);

    let (_actor_read, mut actor_write) = actor.split();
    actor_write.write_all(br#"{"CMD":"ENABLE_SAFETY_LOCK"}"#).await.expect("write toggle");

    let broadcast = recv_object(&mut obs_reader).await;
    assert_eq!(broadcast["CMD"], "ENABLE_SAFETY_LOCK");
    assert_eq!(broadcast["safetyLock"], "1");
}

#[tokio::test]
async fn reversal_mid_rise_ends_up_closed() {
    let (_sim, addr, _shutdown) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(br#"{"CMD":"OPEN"}"#).await.expect("write open");
    let _ = recv_object(&mut reader).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    write_half.write_all(br#"{"CMD":"CLOSE"}"#).await.expect("write close");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["success"], "true");

    tokio::time::sleep(Duration::from_millis(200)).await;
    write_half.write_all(br#"{"CMD":"GET_DOOR_STATUS"}"#).await.expect("write status");
    let reply = recv_object(&mut reader).await;
    assert_eq!(reply["status"], "CLOSED");
}
