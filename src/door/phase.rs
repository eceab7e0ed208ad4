// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// Door motion phase. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "RISING")]
    Rising,
    #[serde(rename = "SLOWING")]
    Slowing,
    #[serde(rename = "HOLDING")]
    Holding,
    #[serde(rename = "KEEPUP")]
    KeepUp,
    #[serde(rename = "CLOSING_TOP_OPEN")]
    ClosingTopOpen,
    #[serde(rename = "CLOSING_MID_OPEN")]
    ClosingMidOpen,
}

impl Phase {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Phase::Closed => "CLOSED",
            Phase::Rising => "RISING",
            Phase::Slowing => "SLOWING",
            Phase::Holding => "HOLDING",
            Phase::KeepUp => "KEEPUP",
            Phase::ClosingTopOpen => "CLOSING_TOP_OPEN",
            Phase::ClosingMidOpen => "CLOSING_MID_OPEN",
        }
    }

    pub fn is_open_or_opening(&self) -> bool {
        matches!(self, Phase::Rising | Phase::Slowing | Phase::Holding | Phase::KeepUp)
    }

    pub fn is_closing(&self) -> bool {
        matches!(self, Phase::ClosingTopOpen | Phase::ClosingMidOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_expected_names() {
        assert_eq!(Phase::ClosingMidOpen.as_wire_str(), "CLOSING_MID_OPEN");
        assert_eq!(Phase::KeepUp.as_wire_str(), "KEEPUP");
    }
}
