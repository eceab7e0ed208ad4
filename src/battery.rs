// SPDX-License-Identifier: MIT

//! Background battery charge/discharge ticker: a `tokio::time::interval`
//! loop selecting against the shutdown token.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::door::Simulator;
use crate::state::LOW_BATTERY_THRESHOLD;

/// Spawn the battery ticker. Runs until `shutdown` is cancelled.
pub fn spawn(sim: Arc<Simulator>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval_secs = { sim.state.inner.lock().await.battery_config.update_interval };
        let mut interval = tokio::time::interval(std::time::Duration::from_secs_f64(interval_secs.max(0.01)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => tick(&sim).await,
            }
        }
    })
}

async fn tick(sim: &Arc<Simulator>) {
    let outcome = {
        let mut state = sim.state.inner.lock().await;
        if !state.battery_present {
            return;
        }
        let before = state.battery_percent;
        let config = state.battery_config;
        let minutes = config.update_interval / 60.0;

        if state.ac_present && config.charge_rate > 0.0 {
            let delta = config.charge_rate * minutes;
            state.battery_percent = ((before as f64 + delta).floor() as i32).min(100);
        } else if !state.ac_present && config.discharge_rate > 0.0 {
            let delta = config.discharge_rate * minutes;
            state.battery_percent = ((before as f64 - delta).ceil() as i32).max(0);
        }
        state.clamp_battery();

        if state.battery_percent == before {
            None
        } else {
            let crossed_low =
                before >= LOW_BATTERY_THRESHOLD && state.battery_percent < LOW_BATTERY_THRESHOLD;
            Some((state.battery_percent, state.battery_present, state.ac_present, crossed_low && state.notify_low_battery))
        }
    };

    if let Some((percent, present, ac_present, notify_low)) = outcome {
        sim.hub.broadcast(crate::protocol::message::battery_broadcast(percent, present, ac_present)).await;
        if notify_low {
            sim.hub.broadcast(crate::protocol::message::low_battery_broadcast(percent)).await;
        }
    }
}

/// Directly set the battery percent (host/test affordance). Emits the same
/// broadcasts a tick would.
pub async fn set_battery(sim: &Arc<Simulator>, percent: i32) {
    let outcome = {
        let mut state = sim.state.inner.lock().await;
        let before = state.battery_percent;
        state.battery_percent = percent;
        state.clamp_battery();
        let crossed_low =
            before >= LOW_BATTERY_THRESHOLD && state.battery_percent < LOW_BATTERY_THRESHOLD;
        (state.battery_percent, state.battery_present, state.ac_present, crossed_low && state.notify_low_battery)
    };
    sim.hub
        .broadcast(crate::protocol::message::battery_broadcast(outcome.0, outcome.1, outcome.2))
        .await;
    if outcome.3 {
        sim.hub.broadcast(crate::protocol::message::low_battery_broadcast(outcome.0)).await;
    }
}

/// Set whether AC power is present (host/test affordance).
pub async fn set_ac_present(sim: &Arc<Simulator>, present: bool) {
    let mut state = sim.state.inner.lock().await;
    state.ac_present = present;
}

/// Set whether a battery is physically present (host/test affordance).
pub async fn set_battery_present(sim: &Arc<Simulator>, present: bool) {
    let mut state = sim.state.inner.lock().await;
    state.battery_present = present;
}

/// Override the charge rate, percent per minute (host/test affordance).
pub async fn set_charge_rate(sim: &Arc<Simulator>, rate: f64) {
    let mut state = sim.state.inner.lock().await;
    state.battery_config.charge_rate = rate;
}

/// Override the discharge rate, percent per minute (host/test affordance).
pub async fn set_discharge_rate(sim: &Arc<Simulator>, rate: f64) {
    let mut state = sim.state.inner.lock().await;
    state.battery_config.discharge_rate = rate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[tokio::test]
    async fn set_battery_clamps_and_crosses_low_threshold() {
        let sim = Simulator::new(&SimConfig::for_tests());
        set_battery(&sim, 25).await;
        set_battery(&sim, 150).await;
        assert_eq!(sim.state.inner.lock().await.battery_percent, 100);
        set_battery(&sim, -5).await;
        assert_eq!(sim.state.inner.lock().await.battery_percent, 0);
    }
}
