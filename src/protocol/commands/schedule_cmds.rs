// SPDX-License-Identifier: MIT

//! Schedule CRUD. Legacy bitmask `daysOfWeek` normalizes to a 7-element
//! mask on the way in; it is always reported back out as a 7-element list.

use std::sync::Arc;

use serde_json::{json, Value};

use super::HandlerFut;
use crate::door::Simulator;
use crate::error::FailureReason;
use crate::protocol::message::{
    failure, parse_time_of_day, parse_wire_bool, schedule_fields, success, to_json,
};
use crate::state::{DayMask, Schedule, TimeOfDay};

fn parse_days_of_week(v: &Value) -> Option<DayMask> {
    match v {
        Value::Array(arr) if arr.len() == 7 => {
            let mut mask = [false; 7];
            for (i, item) in arr.iter().enumerate() {
                mask[i] = parse_wire_bool(item)?;
            }
            Some(mask)
        }
        Value::Number(n) => {
            let bits = n.as_u64()?;
            let mut mask = [false; 7];
            for (i, slot) in mask.iter_mut().enumerate() {
                *slot = (bits >> i) & 1 == 1;
            }
            Some(mask)
        }
        _ => None,
    }
}

pub fn get_schedule_list(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let state = sim.state.inner.lock().await;
        let mut entries: Vec<&Schedule> = state.schedules.values().collect();
        entries.sort_by_key(|s| s.index);
        let list: Vec<Value> = entries.into_iter().map(|s| Value::Object(schedule_fields(s))).collect();
        let fields = serde_json::Map::from_iter([("schedules".to_owned(), Value::Array(list))]);
        success("GET_SCHEDULE_LIST", msg_id.as_ref(), fields)
    })
}

pub fn get_schedule(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let Some(index) = msg.get("index").and_then(Value::as_u64) else {
            return failure("GET_SCHEDULE", msg_id.as_ref(), FailureReason::InvalidArguments.message());
        };
        let state = sim.state.inner.lock().await;
        match state.schedules.get(&(index as u32)) {
            Some(schedule) => success("GET_SCHEDULE", msg_id.as_ref(), schedule_fields(schedule)),
            None => failure("GET_SCHEDULE", msg_id.as_ref(), FailureReason::ScheduleNotFound.message()),
        }
    })
}

pub fn set_schedule(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let Some(index) = msg.get("index").and_then(Value::as_u64) else {
            return failure("SET_SCHEDULE", msg_id.as_ref(), FailureReason::InvalidArguments.message());
        };
        let Some(days_of_week) = msg.get("daysOfWeek").and_then(parse_days_of_week) else {
            return failure("SET_SCHEDULE", msg_id.as_ref(), FailureReason::InvalidArguments.message());
        };
        let schedule = Schedule {
            index: index as u32,
            enabled: msg.get("enabled").and_then(parse_wire_bool).unwrap_or(true),
            days_of_week,
            inside: msg.get("inside").and_then(parse_wire_bool).unwrap_or(false),
            outside: msg.get("outside").and_then(parse_wire_bool).unwrap_or(false),
            inside_start: msg.get("insideStart").and_then(parse_time_of_day).unwrap_or(TimeOfDay::ZERO),
            inside_end: msg.get("insideEnd").and_then(parse_time_of_day).unwrap_or(TimeOfDay::ZERO),
            outside_start: msg.get("outsideStart").and_then(parse_time_of_day).unwrap_or(TimeOfDay::ZERO),
            outside_end: msg.get("outsideEnd").and_then(parse_time_of_day).unwrap_or(TimeOfDay::ZERO),
        };
        let fields = schedule_fields(&schedule);
        {
            let mut state = sim.state.inner.lock().await;
            state.schedules.insert(schedule.index, schedule);
        }
        sim.hub.broadcast(to_json(&success("SET_SCHEDULE", None, fields.clone()))).await;
        success("SET_SCHEDULE", msg_id.as_ref(), fields)
    })
}

pub fn delete_schedule(sim: Arc<Simulator>, msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        let Some(index) = msg.get("index").and_then(Value::as_u64) else {
            return failure("DELETE_SCHEDULE", msg_id.as_ref(), FailureReason::InvalidArguments.message());
        };
        {
            let mut state = sim.state.inner.lock().await;
            state.schedules.remove(&(index as u32));
        }
        let fields = serde_json::Map::from_iter([("index".to_owned(), json!(index))]);
        sim.hub
            .broadcast(to_json(&success("DELETE_SCHEDULE", None, fields.clone())))
            .await;
        success("DELETE_SCHEDULE", msg_id.as_ref(), fields)
    })
}
