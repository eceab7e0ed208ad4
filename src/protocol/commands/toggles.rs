// SPDX-License-Identifier: MIT

//! ENABLE_*/DISABLE_* boolean setting commands. Each toggle broadcasts only
//! its own flag, using the same command tag that triggered it, and is
//! idempotent: setting an already-current value still replies and
//! broadcasts.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::HandlerFut;
use crate::door::Simulator;
use crate::protocol::message::{success, toggle_broadcast, wire_bool};
use crate::state::DoorState;

async fn apply(
    sim: &Arc<Simulator>,
    tag: &'static str,
    field: &'static str,
    value: bool,
    set: impl FnOnce(&mut DoorState, bool),
) -> Map<String, Value> {
    {
        let mut state = sim.state.inner.lock().await;
        set(&mut state, value);
    }
    sim.hub.broadcast(toggle_broadcast(tag, field, value)).await;
    Map::from_iter([(field.to_owned(), Value::String(wire_bool(value).to_owned()))])
}

macro_rules! toggle_handler {
    ($name:ident, $tag:literal, $field:literal, $value:literal, $set:expr) => {
        pub fn $name(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
            Box::pin(async move {
                let fields = apply(&sim, $tag, $field, $value, $set).await;
                success($tag, msg_id.as_ref(), fields)
            })
        }
    };
}

toggle_handler!(power_on, "POWER_ON", "power", true, |s, v| s.power = v);
toggle_handler!(power_off, "POWER_OFF", "power", false, |s, v| s.power = v);
toggle_handler!(enable_inside, "ENABLE_INSIDE", "insideEnabled", true, |s, v| s.inside_enabled = v);
toggle_handler!(disable_inside, "DISABLE_INSIDE", "insideEnabled", false, |s, v| s.inside_enabled = v);
toggle_handler!(enable_outside, "ENABLE_OUTSIDE", "outsideEnabled", true, |s, v| s.outside_enabled = v);
toggle_handler!(disable_outside, "DISABLE_OUTSIDE", "outsideEnabled", false, |s, v| s.outside_enabled = v);
toggle_handler!(enable_auto, "ENABLE_AUTO", "auto", true, |s, v| s.auto = v);
toggle_handler!(disable_auto, "DISABLE_AUTO", "auto", false, |s, v| s.auto = v);
toggle_handler!(enable_safety_lock, "ENABLE_SAFETY_LOCK", "safetyLock", true, |s, v| s.safety_lock = v);
toggle_handler!(disable_safety_lock, "DISABLE_SAFETY_LOCK", "safetyLock", false, |s, v| s
    .safety_lock = v);
toggle_handler!(enable_cmd_lockout, "ENABLE_CMD_LOCKOUT", "cmdLockout", true, |s, v| s
    .cmd_lockout = v);
toggle_handler!(disable_cmd_lockout, "DISABLE_CMD_LOCKOUT", "cmdLockout", false, |s, v| s
    .cmd_lockout = v);
toggle_handler!(enable_autoretract, "ENABLE_AUTORETRACT", "autoRetract", true, |s, v| s
    .autoretract = v);
toggle_handler!(disable_autoretract, "DISABLE_AUTORETRACT", "autoRetract", false, |s, v| s
    .autoretract = v);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[tokio::test]
    async fn enable_safety_lock_sets_flag_and_replies_success() {
        let sim = Simulator::new(&SimConfig::for_tests());
        let reply = enable_safety_lock(Arc::clone(&sim), Value::Null, Some(Value::from(3))).await;
        assert_eq!(reply.get("success"), Some(&Value::String("true".to_owned())));
        assert!(sim.state.inner.lock().await.safety_lock);
    }
}
