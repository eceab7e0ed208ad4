// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::SimConfig;
use crate::door::phase::Phase;

/// Day-of-week mask indexed [Sun, Mon, Tue, Wed, Thu, Fri, Sat].
pub type DayMask = [bool; 7];

pub const ALL_DAYS: DayMask = [true; 7];

/// Fixed timing profile for door motion phases, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingProfile {
    pub rise_time: f64,
    pub slowing_time: f64,
    pub closing_top_time: f64,
    pub closing_mid_time: f64,
    /// Poll cadence for the hold-time blocking-sensor check.
    pub hold_poll_interval: f64,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            rise_time: 1.5,
            slowing_time: 0.3,
            closing_top_time: 0.4,
            closing_mid_time: 0.4,
            hold_poll_interval: 0.1,
        }
    }
}

impl TimingProfile {
    /// The timing profile used by the end-to-end scenario tests.
    pub fn fast_test_profile() -> Self {
        Self {
            rise_time: 0.05,
            slowing_time: 0.02,
            closing_top_time: 0.02,
            closing_mid_time: 0.02,
            hold_poll_interval: 0.01,
        }
    }
}

/// Battery charge/discharge model configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub charge_rate: f64,
    pub discharge_rate: f64,
    pub update_interval: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self { charge_rate: 2.0, discharge_rate: 0.5, update_interval: 60.0 }
    }
}

pub const LOW_BATTERY_THRESHOLD: i32 = 20;

/// Firmware identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Default for FirmwareVersion {
    fn default() -> Self {
        Self { major: 1, minor: 2, patch: 3 }
    }
}

/// Hardware identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HardwareVersion {
    pub version: u32,
    pub revision: u32,
}

impl Default for HardwareVersion {
    fn default() -> Self {
        Self { version: 1, revision: 0 }
    }
}

/// A clock time of day, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub min: u32,
}

impl TimeOfDay {
    pub const ZERO: TimeOfDay = TimeOfDay { hour: 0, min: 0 };

    fn minutes(&self) -> u32 {
        self.hour * 60 + self.min
    }
}

/// A single schedule entry gating one or both sensors. Inside and outside
/// each carry their own window, since a schedule selecting both sensors can
/// legitimately allow them at different hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub index: u32,
    pub enabled: bool,
    pub days_of_week: DayMask,
    pub inside: bool,
    pub outside: bool,
    pub inside_start: TimeOfDay,
    pub inside_end: TimeOfDay,
    pub outside_start: TimeOfDay,
    pub outside_end: TimeOfDay,
}

impl Schedule {
    /// True if this entry applies to `sensor` at the given local weekday
    /// (Sun=0..Sat=6) and hour:minute.
    pub fn allows(&self, inside: bool, weekday0_sun: usize, hour: u32, minute: u32) -> bool {
        if !self.enabled {
            return false;
        }
        if inside && !self.inside {
            return false;
        }
        if !inside && !self.outside {
            return false;
        }
        if !self.days_of_week[weekday0_sun % 7] {
            return false;
        }
        let (start, end) = if inside {
            (self.inside_start, self.inside_end)
        } else {
            (self.outside_start, self.outside_end)
        };
        let now = hour * 60 + minute;
        let start = start.minutes();
        let end = end.minutes();
        if start <= end {
            start <= now && now < end
        } else {
            now >= start || now < end
        }
    }
}

/// The authoritative simulator state. A single instance, mutated under a
/// single `Mutex` — the door is not a high-contention object, and one lock
/// keeps every invariant trivially consistent.
#[derive(Debug, Clone)]
pub struct DoorState {
    pub phase: Phase,

    pub power: bool,
    pub inside_enabled: bool,
    pub outside_enabled: bool,
    pub auto: bool,
    pub safety_lock: bool,
    pub cmd_lockout: bool,
    pub autoretract: bool,

    pub inside_sensor_active: bool,
    pub outside_sensor_active: bool,

    pub hold_time: f64,

    pub battery_percent: i32,
    pub battery_present: bool,
    pub ac_present: bool,
    pub battery_config: BatteryConfig,

    pub firmware: FirmwareVersion,
    pub hardware: HardwareVersion,
    pub reset_reason: String,
    pub has_remote_id: bool,
    pub has_remote_key: bool,

    pub total_open_cycles: u64,
    pub total_auto_retracts: u64,

    pub timezone: String,

    pub sensor_trigger_voltage: i32,
    pub sleep_sensor_trigger_voltage: i32,

    pub notify_inside_on: bool,
    pub notify_inside_off: bool,
    pub notify_outside_on: bool,
    pub notify_outside_off: bool,
    pub notify_low_battery: bool,

    pub schedules: HashMap<u32, Schedule>,

    pub timing: TimingProfile,
}

impl DoorState {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            phase: Phase::Closed,
            power: true,
            inside_enabled: true,
            outside_enabled: true,
            auto: true,
            safety_lock: false,
            cmd_lockout: false,
            autoretract: true,
            inside_sensor_active: false,
            outside_sensor_active: false,
            hold_time: 10.0,
            battery_percent: 85,
            battery_present: true,
            ac_present: true,
            battery_config: config.battery(),
            firmware: config.firmware,
            hardware: config.hardware,
            reset_reason: "POWER_ON".to_owned(),
            has_remote_id: true,
            has_remote_key: true,
            total_open_cycles: 0,
            total_auto_retracts: 0,
            timezone: "UTC".to_owned(),
            sensor_trigger_voltage: 100,
            sleep_sensor_trigger_voltage: 50,
            notify_inside_on: true,
            notify_inside_off: false,
            notify_outside_on: true,
            notify_outside_off: false,
            notify_low_battery: true,
            schedules: HashMap::new(),
            timing: config.timing(),
        }
    }

    /// Reported battery percent: zero on the wire whenever no battery is
    /// physically present, regardless of the last-known charge level.
    pub fn reported_battery_percent(&self) -> i32 {
        if self.battery_present {
            self.battery_percent
        } else {
            0
        }
    }

    pub fn clamp_battery(&mut self) {
        self.battery_percent = self.battery_percent.clamp(0, 100);
    }

    /// A sensor is "blocking" the close sequence.
    pub fn is_blocking(&self, inside: bool) -> bool {
        let active = if inside { self.inside_sensor_active } else { self.outside_sensor_active };
        let enabled = if inside { self.inside_enabled } else { self.outside_enabled };
        if !active || !enabled {
            return false;
        }
        if !inside && self.safety_lock {
            return false;
        }
        !self.cmd_lockout
    }

    pub fn any_blocking(&self) -> bool {
        self.is_blocking(true) || self.is_blocking(false)
    }

    /// Clear both sensor-active flags (used on auto-retract).
    pub fn clear_sensors(&mut self) {
        self.inside_sensor_active = false;
        self.outside_sensor_active = false;
    }

    /// Set one sensor active and clear the other; the two are mutually
    /// exclusive.
    pub fn set_sensor_exclusive(&mut self, inside: bool, active: bool) {
        if inside {
            self.inside_sensor_active = active;
            if active {
                self.outside_sensor_active = false;
            }
        } else {
            self.outside_sensor_active = active;
            if active {
                self.inside_sensor_active = false;
            }
        }
    }

    /// Whether a sensor trigger from the device side is permitted right now,
    /// ignoring schedule gating.
    pub fn trigger_permitted_by_gates(&self, inside: bool) -> bool {
        if !self.power || self.cmd_lockout {
            return false;
        }
        if inside {
            self.inside_enabled
        } else {
            self.outside_enabled && !self.safety_lock
        }
    }
}

/// Shared, lock-guarded simulator state.
pub struct SharedState {
    pub inner: Mutex<DoorState>,
}

impl SharedState {
    pub fn new(config: &SimConfig) -> Arc<Self> {
        Arc::new(Self { inner: Mutex::new(DoorState::new(config)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sched(inside: bool, outside: bool, start: (u32, u32), end: (u32, u32)) -> Schedule {
        let window_start = TimeOfDay { hour: start.0, min: start.1 };
        let window_end = TimeOfDay { hour: end.0, min: end.1 };
        Schedule {
            index: 0,
            enabled: true,
            days_of_week: ALL_DAYS,
            inside,
            outside,
            inside_start: if inside { window_start } else { TimeOfDay::ZERO },
            inside_end: if inside { window_end } else { TimeOfDay::ZERO },
            outside_start: if outside { window_start } else { TimeOfDay::ZERO },
            outside_end: if outside { window_end } else { TimeOfDay::ZERO },
        }
    }

    #[test]
    fn schedule_window_basic() {
        let s = sched(true, false, (9, 0), (17, 0));
        assert!(!s.allows(true, 0, 20, 0));
        assert!(s.allows(true, 0, 10, 0));
        assert!(!s.allows(false, 0, 10, 0));
    }

    #[test]
    fn schedule_window_wraps_midnight() {
        let s = sched(false, true, (22, 0), (6, 0));
        assert!(s.allows(false, 3, 23, 30));
        assert!(s.allows(false, 3, 2, 0));
        assert!(!s.allows(false, 3, 12, 0));
    }

    #[test]
    fn battery_clamps_to_range() {
        let mut state = DoorState::new(&SimConfig::for_tests());
        state.battery_percent = 150;
        state.clamp_battery();
        assert_eq!(state.battery_percent, 100);
        state.battery_percent = -5;
        state.clamp_battery();
        assert_eq!(state.battery_percent, 0);
    }

    #[test]
    fn sensors_are_mutually_exclusive() {
        let mut state = DoorState::new(&SimConfig::for_tests());
        state.set_sensor_exclusive(true, true);
        assert!(state.inside_sensor_active);
        assert!(!state.outside_sensor_active);
        state.set_sensor_exclusive(false, true);
        assert!(!state.inside_sensor_active);
        assert!(state.outside_sensor_active);
    }
}
