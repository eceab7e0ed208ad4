// SPDX-License-Identifier: MIT

use crate::state::{BatteryConfig, FirmwareVersion, HardwareVersion, TimingProfile};

/// Configuration for the door simulator.
#[derive(Debug, Clone, clap::Parser)]
pub struct SimConfig {
    /// Host to bind the wire protocol listener on.
    #[arg(long, default_value = "0.0.0.0", env = "DOORSIM_HOST")]
    pub host: String,

    /// Port to listen on for the device wire protocol.
    #[arg(long, default_value_t = 3000, env = "DOORSIM_PORT")]
    pub port: u16,

    /// Optional control-channel port. If unset, the control channel is not
    /// started.
    #[arg(long, env = "DOORSIM_CONTROL_PORT")]
    pub control_port: Option<u16>,

    /// Firmware major.minor.patch override, e.g. "1.2.3".
    #[arg(long, env = "DOORSIM_FIRMWARE", value_parser = parse_firmware, default_value = "1.2.3")]
    pub firmware: FirmwareVersion,

    /// Hardware ver.rev override, e.g. "1.0".
    #[arg(long, env = "DOORSIM_HARDWARE", value_parser = parse_hardware, default_value = "1.0")]
    pub hardware: HardwareVersion,

    /// Door rise time in seconds.
    #[arg(long, default_value_t = 1.5, env = "DOORSIM_RISE_TIME")]
    pub rise_time: f64,

    /// Slowing-phase duration in seconds.
    #[arg(long, default_value_t = 0.3, env = "DOORSIM_SLOWING_TIME")]
    pub slowing_time: f64,

    /// Closing-top-open phase duration in seconds.
    #[arg(long, default_value_t = 0.4, env = "DOORSIM_CLOSING_TOP_TIME")]
    pub closing_top_time: f64,

    /// Closing-mid-open phase duration in seconds.
    #[arg(long, default_value_t = 0.4, env = "DOORSIM_CLOSING_MID_TIME")]
    pub closing_mid_time: f64,

    /// Hold-extension blocking-sensor poll interval, in seconds.
    #[arg(long, default_value_t = 0.1, env = "DOORSIM_HOLD_POLL_INTERVAL")]
    pub hold_poll_interval: f64,

    /// Battery charge rate, percent per minute, while AC is present.
    #[arg(long, default_value_t = 2.0, env = "DOORSIM_CHARGE_RATE")]
    pub charge_rate: f64,

    /// Battery discharge rate, percent per minute, while AC is absent.
    #[arg(long, default_value_t = 0.5, env = "DOORSIM_DISCHARGE_RATE")]
    pub discharge_rate: f64,

    /// Battery tick interval in seconds.
    #[arg(long, default_value_t = 60.0, env = "DOORSIM_BATTERY_INTERVAL")]
    pub battery_update_interval: f64,

    /// Maximum inbound buffer size, in bytes, before a connection is
    /// considered to have committed a protocol violation.
    #[arg(long, default_value_t = 65536, env = "DOORSIM_MAX_FRAME_BYTES")]
    pub max_frame_bytes: usize,
}

impl SimConfig {
    pub fn timing(&self) -> TimingProfile {
        TimingProfile {
            rise_time: self.rise_time,
            slowing_time: self.slowing_time,
            closing_top_time: self.closing_top_time,
            closing_mid_time: self.closing_mid_time,
            hold_poll_interval: self.hold_poll_interval,
        }
    }

    pub fn battery(&self) -> BatteryConfig {
        BatteryConfig {
            charge_rate: self.charge_rate,
            discharge_rate: self.discharge_rate,
            update_interval: self.battery_update_interval,
        }
    }

    /// A configuration suitable for fast, deterministic tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            control_port: None,
            firmware: FirmwareVersion::default(),
            hardware: HardwareVersion::default(),
            rise_time: 0.05,
            slowing_time: 0.02,
            closing_top_time: 0.02,
            closing_mid_time: 0.02,
            hold_poll_interval: 0.01,
            charge_rate: 2.0,
            discharge_rate: 0.5,
            battery_update_interval: 60.0,
            max_frame_bytes: 65536,
        }
    }
}

fn parse_firmware(s: &str) -> Result<FirmwareVersion, String> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
        return Err(format!("expected major.minor.patch, got {s:?}"));
    }
    let parse = |p: &str| p.parse::<u32>().map_err(|e| format!("{e}"));
    Ok(FirmwareVersion { major: parse(parts[0])?, minor: parse(parts[1])?, patch: parse(parts[2])? })
}

fn parse_hardware(s: &str) -> Result<HardwareVersion, String> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 2 {
        return Err(format!("expected ver.rev, got {s:?}"));
    }
    let parse = |p: &str| p.parse::<u32>().map_err(|e| format!("{e}"));
    Ok(HardwareVersion { version: parse(parts[0])?, revision: parse(parts[1])? })
}
