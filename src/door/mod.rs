// SPDX-License-Identifier: MIT

//! The door state machine: motion phases, sensor activation, and the
//! simulator handle that ties state, the broadcast hub, and the in-flight
//! motion activity together.

pub mod motion;
pub mod phase;
pub mod sensor;

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SimConfig;
use crate::door::phase::Phase;
use crate::state::SharedState;
use crate::transport::hub::Hub;

/// Owns the authoritative state, the peer broadcast hub, and the single
/// in-flight motion activity. A second motion activity is never started
/// concurrently — reversal replaces the current one instead.
pub struct Simulator {
    pub state: Arc<SharedState>,
    pub hub: Arc<Hub>,
    pub shutdown: CancellationToken,
    motion_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Simulator {
    pub fn new(config: &SimConfig) -> Arc<Self> {
        Arc::new(Self {
            state: SharedState::new(config),
            hub: Arc::new(Hub::new()),
            shutdown: CancellationToken::new(),
            motion_task: AsyncMutex::new(None),
        })
    }

    /// Set the motion phase and broadcast the change. Used both by the
    /// motion activity's own phase transitions and by reversal decisions
    /// that change phase synchronously before the activity restarts.
    pub async fn set_phase(&self, phase: Phase) {
        {
            self.state.inner.lock().await.phase = phase;
        }
        self.broadcast_phase(phase).await;
    }

    pub async fn broadcast_phase(&self, phase: Phase) {
        let payload = crate::protocol::message::door_status_broadcast(phase);
        self.hub.broadcast(payload).await;
    }

    /// Directly set the power state (host/simulation affordance, distinct
    /// from the wire `POWER_ON`/`POWER_OFF` commands: those broadcast a
    /// toggle notification, this does not).
    pub async fn set_power(&self, enabled: bool) {
        self.state.inner.lock().await.power = enabled;
    }

    /// Replace the currently tracked motion task, aborting whatever was
    /// running before. A reversal mutates the in-flight activity via
    /// cancellation and restart; two motion tasks never run at once.
    async fn replace_motion_task(&self, task: JoinHandle<()>) {
        let mut slot = self.motion_task.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(task);
    }

    /// Cancel any in-flight motion activity without starting a new one
    /// (used on shutdown).
    pub async fn abort_motion(&self) {
        let mut slot = self.motion_task.lock().await;
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}
