// SPDX-License-Identifier: MIT

//! The sibling control channel: a line-oriented TCP listener for local
//! tooling, carrying both command/response lines and a streamed log feed.
//! The log feed is a `tracing_subscriber` layer that republishes events
//! onto a broadcast channel rather than a pluggable logging-handler swap.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::door::{motion, sensor, Simulator};

/// Capacity of the log broadcast channel; slow control consumers drop the
/// oldest lines rather than back-pressuring the rest of the process.
const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Build the shared log channel and the `tracing_subscriber` layer that
/// feeds it. Call once at startup, before the subscriber is installed.
pub fn log_channel() -> (broadcast::Sender<String>, ControlLogLayer) {
    let (tx, _rx) = broadcast::channel(LOG_CHANNEL_CAPACITY);
    let layer = ControlLogLayer { tx: tx.clone() };
    (tx, layer)
}

/// A `tracing_subscriber::Layer` that formats each event as a single line
/// and republishes it for any listening control connection.
pub struct ControlLogLayer {
    tx: broadcast::Sender<String>,
}

impl<S> Layer<S> for ControlLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        let line = format!("{} {}: {}", event.metadata().level(), event.metadata().target(), message);
        let _ = self.tx.send(line);
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            use std::fmt::Write;
            let _ = write!(self.0, "{value:?}");
        }
    }
}

/// Escape literal backslashes and newlines for a single-line OK:/ERROR:
/// response.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Accept control connections until `shutdown` is cancelled.
pub async fn serve(
    sim: Arc<Simulator>,
    host: String,
    port: u16,
    log_tx: broadcast::Sender<String>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "control channel listener bound");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let sim = Arc::clone(&sim);
                        let log_rx = log_tx.subscribe();
                        let cancel = shutdown.child_token();
                        tokio::spawn(handle_connection(sim, stream, peer_addr, log_rx, cancel));
                    }
                    Err(e) => tracing::warn!(err = %e, "control accept failed"),
                }
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    sim: Arc<Simulator>,
    stream: TcpStream,
    addr: SocketAddr,
    mut log_rx: broadcast::Receiver<String>,
    cancel: CancellationToken,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            log_line = log_rx.recv() => {
                if let Ok(line) = log_line {
                    if write_half.write_all(format!("LOG: {line}\n").as_bytes()).await.is_err() {
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        let response = run_command(&sim, &text).await;
                        if write_half.write_all(format!("{response}\n").as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(peer = %addr, err = %e, "control read error");
                        break;
                    }
                }
            }
        }
    }
    tracing::info!(peer = %addr, "control connection closed");
}

async fn run_command(sim: &Arc<Simulator>, line: &str) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["status"] => {
            let state = sim.state.inner.lock().await;
            format!("OK: phase={} power={} hold_time={}", state.phase.as_wire_str(), state.power, state.hold_time)
        }
        ["stats"] => {
            let state = sim.state.inner.lock().await;
            format!(
                "OK: total_open_cycles={} total_auto_retracts={}",
                state.total_open_cycles, state.total_auto_retracts
            )
        }
        ["open"] => {
            motion::request_open(sim, false).await;
            "OK: open requested".to_owned()
        }
        ["open_hold"] => {
            motion::request_open(sim, true).await;
            "OK: open-and-hold requested".to_owned()
        }
        ["close"] => {
            motion::request_close(sim).await;
            "OK: close requested".to_owned()
        }
        ["power", "on"] => {
            sim.set_power(true).await;
            "OK: power on".to_owned()
        }
        ["power", "off"] => {
            sim.set_power(false).await;
            "OK: power off".to_owned()
        }
        ["obstruction", "on"] => {
            sensor::simulate_obstruction(sim, true).await;
            "OK: obstruction set".to_owned()
        }
        ["obstruction", "off"] => {
            sensor::simulate_obstruction(sim, false).await;
            "OK: obstruction cleared".to_owned()
        }
        ["pet_in_doorway", "on"] => {
            sensor::set_pet_in_doorway(sim, true).await;
            "OK: pet in doorway".to_owned()
        }
        ["pet_in_doorway", "off"] => {
            sensor::set_pet_in_doorway(sim, false).await;
            "OK: pet left doorway".to_owned()
        }
        ["trigger", which] => {
            let inside = match *which {
                "inside" => true,
                "outside" => false,
                other => return format!("ERROR: {}", escape(&format!("unknown sensor {other}"))),
            };
            sensor::trigger(sim, inside, 0.0).await;
            "OK: triggered".to_owned()
        }
        ["trigger", which, duration] => {
            let inside = match *which {
                "inside" => true,
                "outside" => false,
                other => return format!("ERROR: {}", escape(&format!("unknown sensor {other}"))),
            };
            match duration.parse::<f64>() {
                Ok(d) => {
                    sensor::trigger(sim, inside, d).await;
                    "OK: triggered".to_owned()
                }
                Err(_) => format!("ERROR: {}", escape(&format!("invalid duration {duration}"))),
            }
        }
        ["battery", "set", percent] => match percent.parse::<i32>() {
            Ok(p) => {
                crate::battery::set_battery(sim, p).await;
                "OK: battery set".to_owned()
            }
            Err(_) => format!("ERROR: {}", escape(&format!("invalid percent {percent}"))),
        },
        ["battery", "ac", "on"] => {
            crate::battery::set_ac_present(sim, true).await;
            "OK: ac present".to_owned()
        }
        ["battery", "ac", "off"] => {
            crate::battery::set_ac_present(sim, false).await;
            "OK: ac absent".to_owned()
        }
        ["battery", "present", "on"] => {
            crate::battery::set_battery_present(sim, true).await;
            "OK: battery present".to_owned()
        }
        ["battery", "present", "off"] => {
            crate::battery::set_battery_present(sim, false).await;
            "OK: battery absent".to_owned()
        }
        ["broadcast", "door_status"] => {
            let phase = sim.state.inner.lock().await.phase;
            sim.broadcast_phase(phase).await;
            "OK: broadcast sent".to_owned()
        }
        ["broadcast", "settings"] => {
            let state = sim.state.inner.lock().await;
            let fields = crate::protocol::message::settings_fields(&state);
            drop(state);
            sim.hub
                .broadcast(crate::protocol::message::to_json(&crate::protocol::message::success(
                    "GET_SETTINGS",
                    None,
                    fields,
                )))
                .await;
            "OK: broadcast sent".to_owned()
        }
        [] => "ERROR: empty command".to_owned(),
        _ => format!("ERROR: {}", escape(&format!("unknown command {line:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_backslash_and_newline() {
        assert_eq!(escape("a\\b\nc"), "a\\\\b\\nc");
    }

    #[tokio::test]
    async fn status_reports_closed_by_default() {
        let sim = Simulator::new(&crate::config::SimConfig::for_tests());
        let reply = run_command(&sim, "status").await;
        assert!(reply.starts_with("OK: phase=CLOSED"));
    }

    #[tokio::test]
    async fn unknown_command_is_an_error() {
        let sim = Simulator::new(&crate::config::SimConfig::for_tests());
        let reply = run_command(&sim, "bogus thing").await;
        assert!(reply.starts_with("ERROR:"));
    }
}
