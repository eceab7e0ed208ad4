// SPDX-License-Identifier: MIT

//! Eagerly-built command registry, a static table from tag to handler built
//! once at startup. `PING` is handled ahead of the table since it uses a
//! different top-level key, not a command tag.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use super::commands::{actuation, query, schedule_cmds, toggles, Handler};
use super::message::{failure, pong};
use crate::door::Simulator;
use crate::error::FailureReason;

fn build_registry() -> HashMap<&'static str, Handler> {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();

    table.insert("GET_DOOR_STATUS", query::get_door_status);
    table.insert("GET_DOOR_OPEN_STATS", query::get_door_open_stats);
    table.insert("OPEN", actuation::open);
    table.insert("OPEN_AND_HOLD", actuation::open_and_hold);
    table.insert("CLOSE", actuation::close);

    table.insert("POWER_ON", toggles::power_on);
    table.insert("POWER_OFF", toggles::power_off);
    table.insert("ENABLE_INSIDE", toggles::enable_inside);
    table.insert("DISABLE_INSIDE", toggles::disable_inside);
    table.insert("ENABLE_OUTSIDE", toggles::enable_outside);
    table.insert("DISABLE_OUTSIDE", toggles::disable_outside);
    table.insert("ENABLE_AUTO", toggles::enable_auto);
    table.insert("DISABLE_AUTO", toggles::disable_auto);
    table.insert("ENABLE_SAFETY_LOCK", toggles::enable_safety_lock);
    table.insert("DISABLE_SAFETY_LOCK", toggles::disable_safety_lock);
    table.insert("ENABLE_CMD_LOCKOUT", toggles::enable_cmd_lockout);
    table.insert("DISABLE_CMD_LOCKOUT", toggles::disable_cmd_lockout);
    table.insert("ENABLE_AUTORETRACT", toggles::enable_autoretract);
    table.insert("DISABLE_AUTORETRACT", toggles::disable_autoretract);

    table.insert("GET_SETTINGS", query::get_settings);
    table.insert("GET_BATTERY", query::get_battery);
    table.insert("GET_HW_INFO", query::get_hw_info);
    table.insert("GET_NOTIFICATIONS", query::get_notifications);
    table.insert("SET_NOTIFICATIONS", query::set_notifications);
    table.insert("GET_HOLD_TIME", query::get_hold_time);
    table.insert("SET_HOLD_TIME", query::set_hold_time);
    table.insert("GET_TIMEZONE", query::get_timezone);
    table.insert("SET_TIMEZONE", query::set_timezone);

    table.insert("GET_SCHEDULE_LIST", schedule_cmds::get_schedule_list);
    table.insert("GET_SCHEDULE", schedule_cmds::get_schedule);
    table.insert("SET_SCHEDULE", schedule_cmds::set_schedule);
    table.insert("DELETE_SCHEDULE", schedule_cmds::delete_schedule);

    table
}

fn registry() -> &'static HashMap<&'static str, Handler> {
    static REGISTRY: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

/// Pull the command tag out of a message: either of the two equivalent
/// carrier keys, `CMD` or `CONFIG`.
fn command_tag(msg: &Value) -> Option<&str> {
    msg.get("CMD").or_else(|| msg.get("CONFIG")).and_then(Value::as_str)
}

/// Dispatch one parsed JSON object and return the reply to send to the
/// originating peer.
pub async fn dispatch(sim: &Arc<Simulator>, msg: Value) -> Map<String, Value> {
    let msg_id = msg.get("msgId").cloned();

    if let Some(token) = msg.get("PING") {
        return pong(token);
    }

    let Some(tag) = command_tag(&msg) else {
        return failure("UNKNOWN", msg_id.as_ref(), FailureReason::UnknownCommand.message());
    };

    match registry().get(tag) {
        Some(handler) => handler(Arc::clone(sim), msg.clone(), msg_id).await,
        None => failure(tag, msg_id.as_ref(), FailureReason::UnknownCommand.message()),
    }
}
