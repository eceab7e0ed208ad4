// SPDX-License-Identifier: MIT

//! A network simulator for a Power Pet Door: a TCP wire protocol for phone
//! clients, a line-oriented control channel for local tooling, and the
//! door/sensor/battery state machines behind them.

pub mod battery;
pub mod config;
pub mod door;
pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::SimConfig;
use crate::door::Simulator;

/// Run the simulator until one of its listeners fails or the process is
/// signalled to stop. `log_tx` is the control channel's log broadcast,
/// wired up by the caller before the tracing subscriber is installed so no
/// early log lines are lost.
pub async fn run(config: SimConfig, log_tx: broadcast::Sender<String>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let sim = Simulator::new(&config);

    let _battery = battery::spawn(sim.clone(), shutdown.clone());

    let wire = tokio::spawn(transport::server::serve(
        sim.clone(),
        config.host.clone(),
        config.port,
        config.max_frame_bytes,
        shutdown.clone(),
        None,
    ));

    let control = config.control_port.map(|port| {
        tokio::spawn(transport::control::serve(sim.clone(), config.host.clone(), port, log_tx, shutdown.clone()))
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
        result = wire => {
            result??;
        }
    }

    shutdown.cancel();
    sim.abort_motion().await;
    if let Some(control) = control {
        let _ = control.await;
    }
    Ok(())
}
