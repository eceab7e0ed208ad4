// SPDX-License-Identifier: MIT

//! Wire message shapes. Replies and broadcasts are built as `serde_json::Map`
//! rather than fixed structs: the field set genuinely varies per command
//! (query vs setter vs actuation vs broadcast), so one dynamic envelope
//! stands in for a struct per command tag.

use serde_json::{json, Map, Value};

use crate::door::phase::Phase;
use crate::state::{DoorState, Schedule};

pub const DIRECTION: &str = "door-to-phone";

/// Encode a bool the way the device does: `"1"`/`"0"` strings.
pub fn wire_bool(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// Accept either a JSON bool or a `"1"`/`"0"` string.
pub fn parse_wire_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

/// Seconds to wire centiseconds: hold time is reported in centiseconds.
pub fn seconds_to_centiseconds(seconds: f64) -> i64 {
    (seconds * 100.0).round() as i64
}

pub fn centiseconds_to_seconds(centiseconds: i64) -> f64 {
    centiseconds as f64 / 100.0
}

fn envelope(tag: &str, msg_id: Option<&Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("CMD".to_owned(), Value::String(tag.to_owned()));
    map.insert("direction".to_owned(), Value::String(DIRECTION.to_owned()));
    if let Some(id) = msg_id {
        map.insert("msgId".to_owned(), id.clone());
    }
    map
}

/// Build a success reply for `tag`, with `fields` merged in and `msgId`
/// echoed from the request if present.
pub fn success(tag: &str, msg_id: Option<&Value>, fields: Map<String, Value>) -> Map<String, Value> {
    let mut map = envelope(tag, msg_id);
    map.insert("success".to_owned(), Value::String("true".to_owned()));
    map.extend(fields);
    map
}

/// Build a failure reply for `tag` carrying a human-readable `reason`.
pub fn failure(tag: &str, msg_id: Option<&Value>, reason: impl Into<String>) -> Map<String, Value> {
    let mut map = envelope(tag, msg_id);
    map.insert("success".to_owned(), Value::String("false".to_owned()));
    map.insert("reason".to_owned(), Value::String(reason.into()));
    map
}

/// Build the PONG reply.
pub fn pong(token: &Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("CMD".to_owned(), Value::String("PONG".to_owned()));
    map.insert("PONG".to_owned(), token.clone());
    map.insert("success".to_owned(), Value::String("true".to_owned()));
    map.insert("direction".to_owned(), Value::String(DIRECTION.to_owned()));
    map
}

pub fn to_json(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}

/// Door-status broadcast, emitted on every phase transition.
pub fn door_status_broadcast(phase: Phase) -> String {
    let fields = Map::from_iter([("status".to_owned(), Value::String(phase.as_wire_str().to_owned()))]);
    to_json(&success("DOOR_STATUS", None, fields))
}

/// Battery-status broadcast.
pub fn battery_broadcast(percent: i32, present: bool, ac_present: bool) -> String {
    let fields = Map::from_iter([
        ("battery".to_owned(), json!(percent)),
        ("batteryPresent".to_owned(), Value::String(wire_bool(present).to_owned())),
        ("acPresent".to_owned(), Value::String(wire_bool(ac_present).to_owned())),
    ]);
    to_json(&success("BATTERY_STATUS", None, fields))
}

/// Low-battery threshold-crossing notification.
pub fn low_battery_broadcast(percent: i32) -> String {
    let fields = Map::from_iter([("battery".to_owned(), json!(percent))]);
    to_json(&success("LOW_BATTERY", None, fields))
}

/// Lifetime open-cycle/auto-retract counters, shared by the
/// `GET_DOOR_OPEN_STATS` reply and the counters broadcast.
pub fn door_open_stats_fields(total_open_cycles: u64, total_auto_retracts: u64) -> Map<String, Value> {
    Map::from_iter([
        ("totalOpenCycles".to_owned(), json!(total_open_cycles)),
        ("totalAutoRetracts".to_owned(), json!(total_auto_retracts)),
    ])
}

/// Counters broadcast, emitted whenever an open cycle completes or an
/// auto-retract occurs.
pub fn counters_broadcast(total_open_cycles: u64, total_auto_retracts: u64) -> String {
    to_json(&success(
        "GET_DOOR_OPEN_STATS",
        None,
        door_open_stats_fields(total_open_cycles, total_auto_retracts),
    ))
}

/// One boolean-flag broadcast, carrying only that flag. `tag` is the
/// ENABLE_*/DISABLE_* command tag that triggered the change; broadcasts
/// reuse the triggering command's own tag.
pub fn toggle_broadcast(tag: &str, field: &str, value: bool) -> String {
    let fields = Map::from_iter([(field.to_owned(), Value::String(wire_bool(value).to_owned()))]);
    to_json(&success(tag, None, fields))
}

/// Full settings snapshot, used by both `GET_SETTINGS` replies and the
/// settings broadcast.
pub fn settings_fields(state: &DoorState) -> Map<String, Value> {
    Map::from_iter([
        ("power".to_owned(), Value::String(wire_bool(state.power).to_owned())),
        ("insideEnabled".to_owned(), Value::String(wire_bool(state.inside_enabled).to_owned())),
        ("outsideEnabled".to_owned(), Value::String(wire_bool(state.outside_enabled).to_owned())),
        ("auto".to_owned(), Value::String(wire_bool(state.auto).to_owned())),
        ("safetyLock".to_owned(), Value::String(wire_bool(state.safety_lock).to_owned())),
        ("cmdLockout".to_owned(), Value::String(wire_bool(state.cmd_lockout).to_owned())),
        ("autoRetract".to_owned(), Value::String(wire_bool(state.autoretract).to_owned())),
        ("holdTime".to_owned(), json!(seconds_to_centiseconds(state.hold_time))),
        ("sensorTriggerVoltage".to_owned(), json!(state.sensor_trigger_voltage)),
        (
            "sleepSensorTriggerVoltage".to_owned(),
            json!(state.sleep_sensor_trigger_voltage),
        ),
    ])
}

pub fn notifications_fields(state: &DoorState) -> Map<String, Value> {
    Map::from_iter([
        ("notifyInsideOn".to_owned(), Value::String(wire_bool(state.notify_inside_on).to_owned())),
        ("notifyInsideOff".to_owned(), Value::String(wire_bool(state.notify_inside_off).to_owned())),
        ("notifyOutsideOn".to_owned(), Value::String(wire_bool(state.notify_outside_on).to_owned())),
        (
            "notifyOutsideOff".to_owned(),
            Value::String(wire_bool(state.notify_outside_off).to_owned()),
        ),
        (
            "notifyLowBattery".to_owned(),
            Value::String(wire_bool(state.notify_low_battery).to_owned()),
        ),
    ])
}

pub fn hw_info_fields(state: &DoorState) -> Map<String, Value> {
    Map::from_iter([
        (
            "firmwareVersion".to_owned(),
            Value::String(format!(
                "{}.{}.{}",
                state.firmware.major, state.firmware.minor, state.firmware.patch
            )),
        ),
        (
            "hardwareVersion".to_owned(),
            Value::String(format!("{}.{}", state.hardware.version, state.hardware.revision)),
        ),
        ("resetReason".to_owned(), Value::String(state.reset_reason.clone())),
        ("hasRemoteId".to_owned(), Value::String(wire_bool(state.has_remote_id).to_owned())),
        ("hasRemoteKey".to_owned(), Value::String(wire_bool(state.has_remote_key).to_owned())),
    ])
}

fn time_of_day(t: crate::state::TimeOfDay) -> Value {
    json!({ "hour": t.hour, "min": t.min })
}

pub fn parse_time_of_day(v: &Value) -> Option<crate::state::TimeOfDay> {
    let hour = v.get("hour")?.as_u64()? as u32;
    let min = v.get("min")?.as_u64()? as u32;
    Some(crate::state::TimeOfDay { hour, min })
}

/// Wire representation of one schedule entry.
pub fn schedule_fields(s: &Schedule) -> Map<String, Value> {
    let days_of_week: Vec<Value> =
        s.days_of_week.iter().map(|&d| Value::String(wire_bool(d).to_owned())).collect();
    Map::from_iter([
        ("index".to_owned(), json!(s.index)),
        ("enabled".to_owned(), Value::String(wire_bool(s.enabled).to_owned())),
        ("daysOfWeek".to_owned(), Value::Array(days_of_week)),
        ("inside".to_owned(), Value::String(wire_bool(s.inside).to_owned())),
        ("outside".to_owned(), Value::String(wire_bool(s.outside).to_owned())),
        ("insideStart".to_owned(), time_of_day(s.inside_start)),
        ("insideEnd".to_owned(), time_of_day(s.inside_end)),
        ("outsideStart".to_owned(), time_of_day(s.outside_start)),
        ("outsideEnd".to_owned(), time_of_day(s.outside_end)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_reply_echoes_msg_id() {
        let id = json!(42);
        let reply = success("OPEN", Some(&id), Map::new());
        assert_eq!(reply.get("msgId"), Some(&id));
        assert_eq!(reply.get("success"), Some(&Value::String("true".to_owned())));
        assert_eq!(reply.get("direction"), Some(&Value::String(DIRECTION.to_owned())));
    }

    #[test]
    fn centisecond_round_trip() {
        assert_eq!(seconds_to_centiseconds(7.5), 750);
        assert_eq!(centiseconds_to_seconds(750), 7.5);
    }

    #[test]
    fn wire_bool_accepts_string_and_json_bool() {
        assert_eq!(parse_wire_bool(&json!("1")), Some(true));
        assert_eq!(parse_wire_bool(&json!(false)), Some(false));
        assert_eq!(parse_wire_bool(&json!(0)), Some(false));
    }

    #[test]
    fn schedule_days_of_week_are_wire_bool_strings() {
        let s = Schedule {
            index: 0,
            enabled: true,
            days_of_week: [true, false, true, false, true, false, true],
            inside: true,
            outside: false,
            inside_start: crate::state::TimeOfDay::ZERO,
            inside_end: crate::state::TimeOfDay::ZERO,
            outside_start: crate::state::TimeOfDay::ZERO,
            outside_end: crate::state::TimeOfDay::ZERO,
        };
        let fields = schedule_fields(&s);
        let days = fields.get("daysOfWeek").expect("daysOfWeek present").as_array().expect("array");
        let expected: Vec<Value> =
            [true, false, true, false, true, false, true].iter().map(|&b| json!(wire_bool(b))).collect();
        assert_eq!(days, &expected);
    }
}
