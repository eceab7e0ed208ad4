// SPDX-License-Identifier: MIT

//! Phase-timed motion sequencing, state-aware reversal, and auto-retract.
//! Each motion activity runs as a single long-lived task that a reversal
//! aborts and replaces, rather than a fresh fire-and-forget task per phase.

use std::sync::Arc;
use std::time::Duration;

use super::phase::Phase;
use super::Simulator;

/// What a door-motion command actually did, for the reply and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// A fresh cycle was launched from CLOSED.
    Started,
    /// An in-flight cycle's direction was reversed.
    Reversed,
    /// The door was already moving/resting the requested way; nothing changed.
    NoOp,
}

/// Handle an OPEN or OPEN_AND_HOLD command (or a sensor-triggered open from
/// CLOSED). Reverses an in-flight close if one is under way.
pub async fn request_open(sim: &Arc<Simulator>, hold: bool) -> MotionOutcome {
    let decision = {
        let state = sim.state.inner.lock().await;
        match state.phase {
            Phase::Holding | Phase::KeepUp | Phase::Rising | Phase::Slowing => None,
            Phase::ClosingTopOpen => Some((Phase::Slowing, MotionOutcome::Reversed)),
            Phase::ClosingMidOpen => Some((Phase::Rising, MotionOutcome::Reversed)),
            Phase::Closed => Some((Phase::Rising, MotionOutcome::Started)),
        }
    };
    let Some((from_phase, outcome)) = decision else {
        return MotionOutcome::NoOp;
    };

    let task_sim = Arc::clone(sim);
    let task = tokio::spawn(async move {
        task_sim.set_phase(from_phase).await;
        run_open_from(task_sim, from_phase, hold).await;
    });
    sim.replace_motion_task(task).await;
    outcome
}

/// Handle a CLOSE command, symmetric reversal rules to `request_open`.
pub async fn request_close(sim: &Arc<Simulator>) -> MotionOutcome {
    let decision = {
        let state = sim.state.inner.lock().await;
        match state.phase {
            Phase::Closed | Phase::ClosingTopOpen | Phase::ClosingMidOpen => None,
            Phase::Rising => Some((Phase::ClosingMidOpen, MotionOutcome::Reversed)),
            Phase::Slowing => Some((Phase::ClosingTopOpen, MotionOutcome::Reversed)),
            Phase::Holding | Phase::KeepUp => Some((Phase::ClosingTopOpen, MotionOutcome::Started)),
        }
    };
    let Some((from_phase, outcome)) = decision else {
        return MotionOutcome::NoOp;
    };

    let task_sim = Arc::clone(sim);
    let task = tokio::spawn(async move {
        task_sim.set_phase(from_phase).await;
        run_close_from(task_sim, from_phase).await;
    });
    sim.replace_motion_task(task).await;
    outcome
}

/// Run the remainder of an open cycle starting from `from_phase`, which has
/// already been entered and broadcast by the caller.
async fn run_open_from(sim: Arc<Simulator>, from_phase: Phase, hold: bool) {
    let timing = { sim.state.inner.lock().await.timing };

    if from_phase == Phase::Rising {
        tokio::time::sleep(Duration::from_secs_f64(timing.rise_time)).await;
        sim.set_phase(Phase::Slowing).await;
    }
    tokio::time::sleep(Duration::from_secs_f64(timing.slowing_time)).await;

    if hold {
        sim.set_phase(Phase::KeepUp).await;
        return;
    }

    sim.set_phase(Phase::Holding).await;
    hold_loop(&sim).await;

    sim.set_phase(Phase::ClosingTopOpen).await;
    run_close_from(sim, Phase::ClosingTopOpen).await;
}

/// Run the remainder of a close cycle starting from `from_phase`, which has
/// already been entered and broadcast by the caller.
async fn run_close_from(sim: Arc<Simulator>, from_phase: Phase) {
    let timing = { sim.state.inner.lock().await.timing };

    if from_phase == Phase::ClosingTopOpen {
        tokio::time::sleep(Duration::from_secs_f64(timing.closing_top_time)).await;
        if check_retract(&sim).await {
            run_open_from(sim, Phase::Rising, false).await;
            return;
        }
        sim.set_phase(Phase::ClosingMidOpen).await;
    }

    tokio::time::sleep(Duration::from_secs_f64(timing.closing_mid_time)).await;
    if check_retract(&sim).await {
        run_open_from(sim, Phase::Rising, false).await;
        return;
    }

    sim.set_phase(Phase::Closed).await;
    let counters = {
        let mut state = sim.state.inner.lock().await;
        state.total_open_cycles += 1;
        (state.total_open_cycles, state.total_auto_retracts)
    };
    sim.hub.broadcast(crate::protocol::message::counters_broadcast(counters.0, counters.1)).await;
}

/// Poll for a blocking sensor while HOLDING, extending the hold as long as
/// one is present.
async fn hold_loop(sim: &Arc<Simulator>) {
    let (poll, mut remaining) = {
        let state = sim.state.inner.lock().await;
        (state.timing.hold_poll_interval, state.hold_time)
    };
    loop {
        tokio::time::sleep(Duration::from_secs_f64(poll)).await;
        let (blocking, hold_time) = {
            let state = sim.state.inner.lock().await;
            (state.any_blocking(), state.hold_time)
        };
        if blocking {
            remaining = hold_time;
            continue;
        }
        remaining -= poll;
        if remaining <= 0.0 {
            break;
        }
    }
}

/// After a closing phase timer elapses, check whether a blocking sensor
/// should abort the close. On abort, clears both sensor flags and bumps the
/// auto-retract counter.
async fn check_retract(sim: &Arc<Simulator>) -> bool {
    let counters = {
        let mut state = sim.state.inner.lock().await;
        if !(state.any_blocking() && state.autoretract) {
            return false;
        }
        state.clear_sensors();
        state.total_auto_retracts += 1;
        (state.total_open_cycles, state.total_auto_retracts)
    };
    sim.hub.broadcast(crate::protocol::message::counters_broadcast(counters.0, counters.1)).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[tokio::test]
    async fn basic_cycle_reaches_closed_and_counts() {
        let sim = Simulator::new(&SimConfig::for_tests());
        let outcome = request_open(&sim, false).await;
        assert_eq!(outcome, MotionOutcome::Started);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let state = sim.state.inner.lock().await;
        assert_eq!(state.phase, Phase::Closed);
        assert_eq!(state.total_open_cycles, 1);
    }

    #[tokio::test]
    async fn reversal_mid_rise_skips_top_open() {
        let sim = Simulator::new(&SimConfig::for_tests());
        request_open(&sim, false).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let outcome = request_close(&sim).await;
        assert_eq!(outcome, MotionOutcome::Reversed);
        {
            let state = sim.state.inner.lock().await;
            assert_eq!(state.phase, Phase::ClosingMidOpen);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = sim.state.inner.lock().await;
        assert_eq!(state.phase, Phase::Closed);
    }

    #[tokio::test]
    async fn open_while_already_open_is_noop() {
        let sim = Simulator::new(&SimConfig::for_tests());
        request_open(&sim, true).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        {
            let state = sim.state.inner.lock().await;
            assert_eq!(state.phase, Phase::KeepUp);
        }
        let outcome = request_open(&sim, false).await;
        assert_eq!(outcome, MotionOutcome::NoOp);
    }

    #[tokio::test]
    async fn auto_retract_reverses_into_rising() {
        let sim = Simulator::new(&SimConfig::for_tests());
        {
            let mut state = sim.state.inner.lock().await;
            state.hold_time = 0.02;
        }
        request_open(&sim, false).await;
        // Wait for HOLDING, then block it so the close is delayed at least
        // one hold_time window before we let it proceed.
        tokio::time::sleep(Duration::from_millis(90)).await;
        {
            let mut state = sim.state.inner.lock().await;
            state.inside_sensor_active = true;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        {
            let mut state = sim.state.inner.lock().await;
            assert_eq!(state.phase, Phase::Holding, "blocking sensor should extend the hold");
            state.inside_sensor_active = false;
        }
        // Door begins closing; re-block during CLOSING_TOP_OPEN to force a
        // retract.
        tokio::time::sleep(Duration::from_millis(15)).await;
        {
            let mut state = sim.state.inner.lock().await;
            state.inside_sensor_active = true;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        let state = sim.state.inner.lock().await;
        assert_eq!(state.total_auto_retracts, 1);
        assert!(!state.inside_sensor_active);
        assert!(!state.outside_sensor_active);
    }
}
