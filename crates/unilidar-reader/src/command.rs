//! Host-to-device commands.
//!
//! ```text
//! WORK_MODE    mode u8 (0 = Normal, 1 = Standby)
//! LED_DISPLAY  45-byte brightness table, or a 1-byte pattern selector
//! ```
//!
//! The two LED encodings share one type tag and are told apart by length.

use serde::Serialize;
use unilidar_frame::{Frame, LED_DISPLAY, WORK_MODE};

use crate::error::DecodeError;

/// Number of LEDs in the display ring.
pub const LED_TABLE_LEN: usize = 45;

/// Device working mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingMode {
    /// Spinning and streaming telemetry.
    Normal,
    /// Motor stopped, no point clouds.
    Standby,
}

impl WorkingMode {
    /// Wire value.
    pub fn as_byte(self) -> u8 {
        match self {
            WorkingMode::Normal => 0x00,
            WorkingMode::Standby => 0x01,
        }
    }
}

impl TryFrom<u8> for WorkingMode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(WorkingMode::Normal),
            0x01 => Ok(WorkingMode::Standby),
            other => Err(DecodeError::WorkingMode(other)),
        }
    }
}

/// Built-in LED animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedPattern {
    ForwardSlow,
    ReverseSlow,
    SixStageBreathing,
}

impl LedPattern {
    /// Wire selector.
    pub fn as_byte(self) -> u8 {
        match self {
            LedPattern::ForwardSlow => 0x01,
            LedPattern::ReverseSlow => 0x02,
            LedPattern::SixStageBreathing => 0x03,
        }
    }
}

impl TryFrom<u8> for LedPattern {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(LedPattern::ForwardSlow),
            0x02 => Ok(LedPattern::ReverseSlow),
            0x03 => Ok(LedPattern::SixStageBreathing),
            other => Err(DecodeError::LedPattern(other)),
        }
    }
}

/// What the LED ring should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedDisplayMode {
    /// Per-LED brightness, 0-255.
    Table([u8; LED_TABLE_LEN]),
    /// A built-in animation.
    Pattern(LedPattern),
}

impl LedDisplayMode {
    /// Every LED at full brightness.
    pub fn all_on() -> Self {
        LedDisplayMode::Table([0xFF; LED_TABLE_LEN])
    }

    /// Every LED off.
    pub fn all_off() -> Self {
        LedDisplayMode::Table([0x00; LED_TABLE_LEN])
    }
}

impl From<LedPattern> for LedDisplayMode {
    fn from(pattern: LedPattern) -> Self {
        LedDisplayMode::Pattern(pattern)
    }
}

impl From<[u8; LED_TABLE_LEN]> for LedDisplayMode {
    fn from(table: [u8; LED_TABLE_LEN]) -> Self {
        LedDisplayMode::Table(table)
    }
}

/// A request the host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetWorkingMode(WorkingMode),
    SetLedDisplayMode(LedDisplayMode),
}

impl Command {
    /// Type tag this command is framed under.
    pub fn msg_type(&self) -> u16 {
        match self {
            Command::SetWorkingMode(_) => WORK_MODE,
            Command::SetLedDisplayMode(_) => LED_DISPLAY,
        }
    }

    /// Wire payload.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::SetWorkingMode(mode) => vec![mode.as_byte()],
            Command::SetLedDisplayMode(LedDisplayMode::Table(table)) => table.to_vec(),
            Command::SetLedDisplayMode(LedDisplayMode::Pattern(pattern)) => {
                vec![pattern.as_byte()]
            }
        }
    }

    /// The complete frame for this command.
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.msg_type(), self.payload())
    }

    /// Parse a command frame, as the device would.
    pub fn decode(frame: &Frame) -> Result<Self, DecodeError> {
        let payload = frame.payload.as_ref();
        match frame.msg_type {
            WORK_MODE => match payload {
                [mode] => Ok(Command::SetWorkingMode(WorkingMode::try_from(*mode)?)),
                _ => Err(DecodeError::Length {
                    kind: "work_mode",
                    expected: 1,
                    actual: payload.len(),
                }),
            },
            LED_DISPLAY => match payload {
                [selector] => Ok(Command::SetLedDisplayMode(LedDisplayMode::Pattern(
                    LedPattern::try_from(*selector)?,
                ))),
                _ => {
                    let table: [u8; LED_TABLE_LEN] =
                        payload.try_into().map_err(|_| DecodeError::Length {
                            kind: "led_display",
                            expected: LED_TABLE_LEN,
                            actual: payload.len(),
                        })?;
                    Ok(Command::SetLedDisplayMode(LedDisplayMode::Table(table)))
                }
            },
            other => Err(DecodeError::NotACommand(other)),
        }
    }
}
