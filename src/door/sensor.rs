// SPDX-License-Identifier: MIT

//! Sensor activation: toggle/pulse triggers, mutual exclusion, schedule
//! gating, and launching an open cycle from CLOSED.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Timelike};

use super::motion;
use super::phase::Phase;
use super::Simulator;
use crate::state::DoorState;

/// Fire a sensor trigger as the device hardware would (not a wire command;
/// this is a host/simulation affordance). `duration` is the pulse length in
/// seconds; zero means toggle mode.
pub async fn trigger(sim: &Arc<Simulator>, inside: bool, duration: f64) {
    let activated = {
        let mut state = sim.state.inner.lock().await;
        if !state.trigger_permitted_by_gates(inside) {
            tracing::info!(inside, "sensor trigger dropped: gated");
            return;
        }
        if !schedule_allows(&state, inside) {
            tracing::info!(inside, "sensor trigger dropped: denied by schedule");
            return;
        }
        activate(&mut state, inside, duration)
    };

    if activated && duration > 0.0 {
        let sim = Arc::clone(sim);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(duration)).await;
            let mut state = sim.state.inner.lock().await;
            if inside {
                state.inside_sensor_active = false;
            } else {
                state.outside_sensor_active = false;
            }
        });
    }

    let should_open = activated && {
        let state = sim.state.inner.lock().await;
        state.phase == Phase::Closed
    };
    if should_open {
        motion::request_open(sim, false).await;
    }
}

/// Apply toggle/pulse semantics to the state (must be called under the
/// state lock). Returns whether the sensor ended up active.
fn activate(state: &mut DoorState, inside: bool, duration: f64) -> bool {
    if duration > 0.0 {
        state.set_sensor_exclusive(inside, true);
        return true;
    }
    let currently_active = if inside { state.inside_sensor_active } else { state.outside_sensor_active };
    let next = !currently_active;
    if next {
        state.set_sensor_exclusive(inside, true);
    } else if inside {
        state.inside_sensor_active = false;
    } else {
        state.outside_sensor_active = false;
    }
    next
}

/// Set the inside sensor active indefinitely, simulating an obstruction
/// (host/simulation affordance; unlike `trigger`'s pulse/toggle model this
/// has no auto-clear timer and stays active until cleared). Works in any
/// door phase: it blocks HOLDING from closing and triggers auto-retract if
/// raised while already closing.
pub async fn simulate_obstruction(sim: &Arc<Simulator>, active: bool) {
    sim.state.inner.lock().await.inside_sensor_active = active;
}

/// Mark a pet standing in the doorway on the inside sensor, indefinitely
/// (host/simulation affordance, same indefinite-activation shape as
/// `simulate_obstruction`; also clears the outside sensor when set, since
/// the two are mutually exclusive).
pub async fn set_pet_in_doorway(sim: &Arc<Simulator>, present: bool) {
    let mut state = sim.state.inner.lock().await;
    state.inside_sensor_active = present;
    if present {
        state.outside_sensor_active = false;
    }
}

/// Schedule gating. Timezone string translation is out of scope; local
/// wall-clock time stands in for the configured timezone.
fn schedule_allows(state: &DoorState, inside: bool) -> bool {
    if !state.auto || state.schedules.is_empty() {
        return true;
    }
    let now = chrono::Local::now();
    let weekday0_sun = ((now.weekday().num_days_from_monday() + 1) % 7) as usize;
    let hour = now.hour();
    let minute = now.minute();
    state.schedules.values().any(|s| s.allows(inside, weekday0_sun, hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[tokio::test]
    async fn trigger_from_closed_opens_door() {
        let sim = Simulator::new(&SimConfig::for_tests());
        trigger(&sim, true, 0.0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = sim.state.inner.lock().await;
        assert_ne!(state.phase, Phase::Closed);
    }

    #[tokio::test]
    async fn power_off_drops_trigger() {
        let sim = Simulator::new(&SimConfig::for_tests());
        {
            let mut state = sim.state.inner.lock().await;
            state.power = false;
        }
        trigger(&sim, true, 0.0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = sim.state.inner.lock().await;
        assert_eq!(state.phase, Phase::Closed);
        assert!(!state.inside_sensor_active);
    }

    #[tokio::test]
    async fn simulate_obstruction_stays_active_with_no_auto_clear() {
        let sim = Simulator::new(&SimConfig::for_tests());
        simulate_obstruction(&sim, true).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sim.state.inner.lock().await.inside_sensor_active);
        simulate_obstruction(&sim, false).await;
        assert!(!sim.state.inner.lock().await.inside_sensor_active);
    }

    #[tokio::test]
    async fn set_pet_in_doorway_clears_outside_sensor() {
        let sim = Simulator::new(&SimConfig::for_tests());
        {
            let mut state = sim.state.inner.lock().await;
            state.outside_sensor_active = true;
        }
        set_pet_in_doorway(&sim, true).await;
        let state = sim.state.inner.lock().await;
        assert!(state.inside_sensor_active);
        assert!(!state.outside_sensor_active);
    }

    #[tokio::test]
    async fn toggle_flips_and_clears_other_sensor() {
        let sim = Simulator::new(&SimConfig::for_tests());
        trigger(&sim, true, 0.0).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(sim.state.inner.lock().await.inside_sensor_active);
        trigger(&sim, false, 0.0).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let state = sim.state.inner.lock().await;
        assert!(state.outside_sensor_active);
        assert!(!state.inside_sensor_active);
    }
}
