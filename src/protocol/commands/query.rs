// SPDX-License-Identifier: MIT

//! Query and simple setter commands: door status, settings, battery,
//! hardware info, notifications, hold time, timezone.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::HandlerFut;
use crate::door::Simulator;
use crate::error::FailureReason;
use crate::protocol::message::{
    centiseconds_to_seconds, door_open_stats_fields, failure, hw_info_fields, notifications_fields,
    parse_wire_bool, seconds_to_centiseconds, settings_fields, success, wire_bool,
};

pub fn get_door_status(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let phase = sim.state.inner.lock().await.phase;
        let fields = Map::from_iter([("status".to_owned(), Value::String(phase.as_wire_str().to_owned()))]);
        success("GET_DOOR_STATUS", msg_id.as_ref(), fields)
    })
}

pub fn get_settings(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let fields = settings_fields(&*sim.state.inner.lock().await);
        success("GET_SETTINGS", msg_id.as_ref(), fields)
    })
}

pub fn get_battery(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let state = sim.state.inner.lock().await;
        let fields = Map::from_iter([
            ("battery".to_owned(), json!(state.reported_battery_percent())),
            (
                "batteryPresent".to_owned(),
                Value::String(wire_bool(state.battery_present).to_owned()),
            ),
            ("acPresent".to_owned(), Value::String(wire_bool(state.ac_present).to_owned())),
            ("chargeRate".to_owned(), json!(state.battery_config.charge_rate)),
            ("dischargeRate".to_owned(), json!(state.battery_config.discharge_rate)),
        ]);
        success("GET_BATTERY", msg_id.as_ref(), fields)
    })
}

pub fn get_door_open_stats(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let state = sim.state.inner.lock().await;
        let fields = door_open_stats_fields(state.total_open_cycles, state.total_auto_retracts);
        success("GET_DOOR_OPEN_STATS", msg_id.as_ref(), fields)
    })
}

pub fn get_hw_info(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let fields = hw_info_fields(&*sim.state.inner.lock().await);
        success("GET_HW_INFO", msg_id.as_ref(), fields)
    })
}

pub fn get_notifications(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let fields = notifications_fields(&*sim.state.inner.lock().await);
        success("GET_NOTIFICATIONS", msg_id.as_ref(), fields)
    })
}

pub fn set_notifications(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let mut state = sim.state.inner.lock().await;
        if let Some(v) = msg.get("notifyInsideOn").and_then(parse_wire_bool) {
            state.notify_inside_on = v;
        }
        if let Some(v) = msg.get("notifyInsideOff").and_then(parse_wire_bool) {
            state.notify_inside_off = v;
        }
        if let Some(v) = msg.get("notifyOutsideOn").and_then(parse_wire_bool) {
            state.notify_outside_on = v;
        }
        if let Some(v) = msg.get("notifyOutsideOff").and_then(parse_wire_bool) {
            state.notify_outside_off = v;
        }
        if let Some(v) = msg.get("notifyLowBattery").and_then(parse_wire_bool) {
            state.notify_low_battery = v;
        }
        let fields = notifications_fields(&state);
        drop(state);
        sim.hub
            .broadcast(crate::protocol::message::to_json(&success(
                "SET_NOTIFICATIONS",
                None,
                fields.clone(),
            )))
            .await;
        success("SET_NOTIFICATIONS", msg_id.as_ref(), fields)
    })
}

pub fn get_hold_time(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let hold_time = sim.state.inner.lock().await.hold_time;
        let fields =
            Map::from_iter([("holdTime".to_owned(), json!(seconds_to_centiseconds(hold_time)))]);
        success("GET_HOLD_TIME", msg_id.as_ref(), fields)
    })
}

pub fn set_hold_time(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let Some(centiseconds) = msg.get("holdTime").and_then(Value::as_i64) else {
            return failure(
                "SET_HOLD_TIME",
                msg_id.as_ref(),
                FailureReason::InvalidArguments.message(),
            );
        };
        if centiseconds < 0 {
            return failure(
                "SET_HOLD_TIME",
                msg_id.as_ref(),
                FailureReason::InvalidArguments.message(),
            );
        }
        let seconds = centiseconds_to_seconds(centiseconds);
        sim.state.inner.lock().await.hold_time = seconds;
        let fields = Map::from_iter([("holdTime".to_owned(), json!(centiseconds))]);
        sim.hub
            .broadcast(crate::protocol::message::to_json(&success(
                "SET_HOLD_TIME",
                None,
                fields.clone(),
            )))
            .await;
        success("SET_HOLD_TIME", msg_id.as_ref(), fields)
    })
}

pub fn get_timezone(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let tz = sim.state.inner.lock().await.timezone.clone();
        let fields = Map::from_iter([("timezone".to_owned(), Value::String(tz))]);
        success("GET_TIMEZONE", msg_id.as_ref(), fields)
    })
}

pub fn set_timezone(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let Some(tz) = msg.get("timezone").and_then(Value::as_str) else {
            return failure(
                "SET_TIMEZONE",
                msg_id.as_ref(),
                FailureReason::InvalidArguments.message(),
            );
        };
        sim.state.inner.lock().await.timezone = tz.to_owned();
        let fields = Map::from_iter([("timezone".to_owned(), Value::String(tz.to_owned()))]);
        sim.hub
            .broadcast(crate::protocol::message::to_json(&success(
                "SET_TIMEZONE",
                None,
                fields.clone(),
            )))
            .await;
        success("SET_TIMEZONE", msg_id.as_ref(), fields)
    })
}
