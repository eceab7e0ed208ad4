// SPDX-License-Identifier: MIT

//! Failure reasons reported on the wire: a plain enum with a stable wire
//! string and human-readable message, rather than a `std::error::Error`
//! impl — these are protocol-level outcomes, not faults.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a command from a peer was rejected instead of acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// `power` is currently false; actuation and sensor commands are inert.
    PowerOff,
    /// `cmd_lockout` is currently true.
    CommandLockout,
    /// The `type` tag did not match any entry in the command registry.
    UnknownCommand,
    /// The command was recognized but its arguments failed validation.
    InvalidArguments,
    /// A schedule command referenced an index that does not exist.
    ScheduleNotFound,
    /// The inbound buffer exceeded the configured frame ceiling without
    /// completing a JSON object.
    FrameTooLarge,
    /// The bytes between two frame boundaries did not parse as JSON.
    MalformedJson,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerOff => "POWER_OFF",
            Self::CommandLockout => "CMD_LOCKOUT",
            Self::UnknownCommand => "UNKNOWN_COMMAND",
            Self::InvalidArguments => "INVALID_ARGUMENTS",
            Self::ScheduleNotFound => "SCHEDULE_NOT_FOUND",
            Self::FrameTooLarge => "FRAME_TOO_LARGE",
            Self::MalformedJson => "MALFORMED_JSON",
        }
    }

    /// Human-readable text for the wire `reason` field.
    pub fn message(&self) -> &'static str {
        match self {
            Self::PowerOff => "door power is off",
            Self::CommandLockout => "command lockout is engaged",
            Self::UnknownCommand => "unknown command",
            Self::InvalidArguments => "invalid arguments",
            Self::ScheduleNotFound => "schedule not found",
            Self::FrameTooLarge => "frame exceeds maximum size",
            Self::MalformedJson => "malformed json",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
