//! Structures derived from the great work of the community of the Game Controller
//! Collective Wiki.
//! Source: https://controllers.fandom.com/wiki/Sony_DualSense
use packed_struct::{prelude::*, PackedStructSlice};
use thiserror::Error;

use super::driver::*;

/// Reasons an input report cannot be decoded
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid report size: Expected at least {expected}, Got {got}")]
    TooShort { expected: usize, got: usize },
    #[error("Invalid report id: {0}")]
    InvalidReportId(u8),
    #[error("Unable to unpack report: {0:?}")]
    Unpack(PackingError),
}

/// Input report exactly as it was read from the interrupt endpoint, along
/// with the number of bytes that were actually transferred.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawDeviceReport {
    data: [u8; INPUT_REPORT_USB_SIZE],
    len: usize,
}

impl RawDeviceReport {
    pub fn new(data: [u8; INPUT_REPORT_USB_SIZE], len: usize) -> Self {
        Self {
            data,
            len: len.min(INPUT_REPORT_USB_SIZE),
        }
    }

    /// Copy up to [INPUT_REPORT_USB_SIZE] bytes out of the given buffer
    pub fn from_slice(buf: &[u8]) -> Self {
        let len = buf.len().min(INPUT_REPORT_USB_SIZE);
        let mut data = [0; INPUT_REPORT_USB_SIZE];
        data[..len].copy_from_slice(&buf[..len]);
        Self { data, len }
    }

    /// Transferred bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn report_id(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug, Default)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
    #[default]
    None = 8,
}

/// Leading section of the USB input report (0x01) that carries the sticks,
/// triggers and every button. The motion, touch and battery data that follows
/// it is not used.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "11")]
pub struct PackedInputStateReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x01)

    // byte 1-7
    #[packed_field(bytes = "1")]
    pub joystick_l_x: u8, // left stick X axis
    #[packed_field(bytes = "2")]
    pub joystick_l_y: u8, // left stick Y axis
    #[packed_field(bytes = "3")]
    pub joystick_r_x: u8, // right stick X axis
    #[packed_field(bytes = "4")]
    pub joystick_r_y: u8, // right stick Y axis
    #[packed_field(bytes = "5")]
    pub l2_trigger: u8, // L2 trigger axis
    #[packed_field(bytes = "6")]
    pub r2_trigger: u8, // R2 trigger axis
    #[packed_field(bytes = "7")]
    pub seq_number: u8,

    // byte 8
    #[packed_field(bits = "64")]
    pub triangle: bool, // Button cluster, x, ◯, □, ∆
    #[packed_field(bits = "65")]
    pub circle: bool,
    #[packed_field(bits = "66")]
    pub cross: bool,
    #[packed_field(bits = "67")]
    pub square: bool,
    // Hat switch, 0-7 clockwise from north and 8 when released
    #[packed_field(bits = "68..=71")]
    pub dpad: Integer<u8, packed_bits::Bits<4>>,

    // byte 9
    #[packed_field(bits = "72")]
    pub r3: bool,
    #[packed_field(bits = "73")]
    pub l3: bool,
    #[packed_field(bits = "74")]
    pub options: bool, // Options button ☰
    #[packed_field(bits = "75")]
    pub create: bool, // Create button ⚟
    #[packed_field(bits = "76")]
    pub r2: bool, // Triggers
    #[packed_field(bits = "77")]
    pub l2: bool,
    #[packed_field(bits = "78")]
    pub r1: bool,
    #[packed_field(bits = "79")]
    pub l1: bool,

    // byte 10
    #[packed_field(bits = "80")]
    pub right_paddle: bool, // Right paddle button (DualSense Edge)
    #[packed_field(bits = "81")]
    pub left_paddle: bool, // Left paddle button (DualSense Edge)
    #[packed_field(bits = "82")]
    pub right_fn: bool, // Right function button (DualSense Edge)
    #[packed_field(bits = "83")]
    pub left_fn: bool, // Left function button (DualSense Edge)
    #[packed_field(bits = "84")]
    pub _unkn_0: bool, // Appears unused
    #[packed_field(bits = "85")]
    pub mute: bool, // Mic mute button 🔇
    #[packed_field(bits = "86")]
    pub touchpad: bool, // Touchpad button
    #[packed_field(bits = "87")]
    pub ps: bool, // PS button
}

impl PackedInputStateReport {
    /// Decode the leading section of a USB input report. Only the standard
    /// input report id is accepted and the buffer must hold at least
    /// [INPUT_REPORT_MIN_SIZE] bytes.
    pub fn unpack(buf: &[u8]) -> Result<Self, ReportError> {
        if buf.len() < INPUT_REPORT_MIN_SIZE {
            return Err(ReportError::TooShort {
                expected: INPUT_REPORT_MIN_SIZE,
                got: buf.len(),
            });
        }
        let report_id = buf[0];
        if report_id != INPUT_REPORT_USB {
            return Err(ReportError::InvalidReportId(report_id));
        }

        Self::unpack_from_slice(&buf[..INPUT_REPORT_MIN_SIZE]).map_err(ReportError::Unpack)
    }

    /// Direction of the hat switch, or `None` for values outside of the
    /// known range.
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_primitive(self.dpad.to_primitive())
    }
}

impl Default for PackedInputStateReport {
    fn default() -> Self {
        Self {
            report_id: INPUT_REPORT_USB,
            joystick_l_x: 127,
            joystick_l_y: 127,
            joystick_r_x: 127,
            joystick_r_y: 127,
            l2_trigger: Default::default(),
            r2_trigger: Default::default(),
            seq_number: Default::default(),
            triangle: Default::default(),
            circle: Default::default(),
            cross: Default::default(),
            square: Default::default(),
            dpad: Integer::from_primitive(Direction::None.to_primitive()),
            r3: Default::default(),
            l3: Default::default(),
            options: Default::default(),
            create: Default::default(),
            r2: Default::default(),
            l2: Default::default(),
            r1: Default::default(),
            l1: Default::default(),
            right_paddle: Default::default(),
            left_paddle: Default::default(),
            right_fn: Default::default(),
            left_fn: Default::default(),
            _unkn_0: Default::default(),
            mute: Default::default(),
            touchpad: Default::default(),
            ps: Default::default(),
        }
    }
}

/// Valid flag bytes at the start of the set state output data. Each flag
/// tells the controller which part of the output state should be applied.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "2")]
pub struct SetStateValidFlags {
    // byte 0
    #[packed_field(bits = "0")]
    pub allow_audio_control: bool,
    #[packed_field(bits = "1")]
    pub allow_mic_volume: bool,
    #[packed_field(bits = "2")]
    pub allow_speaker_volume: bool,
    #[packed_field(bits = "3")]
    pub allow_headphone_volume: bool,
    #[packed_field(bits = "4")]
    pub allow_left_trigger_ffb: bool,
    #[packed_field(bits = "5")]
    pub allow_right_trigger_ffb: bool,
    #[packed_field(bits = "6")]
    pub use_rumble_not_haptics: bool,
    #[packed_field(bits = "7")]
    pub enable_rumble_emulation: bool,

    // byte 1
    #[packed_field(bits = "8")]
    pub allow_audio_control2: bool,
    #[packed_field(bits = "9")]
    pub allow_motor_power_level: bool,
    #[packed_field(bits = "10")]
    pub allow_haptic_low_pass_filter: bool,
    #[packed_field(bits = "11")]
    pub allow_player_indicators: bool,
    #[packed_field(bits = "12")]
    pub reset_lights: bool,
    #[packed_field(bits = "13")]
    pub allow_led_color: bool, // Enable RGB LED section
    #[packed_field(bits = "14")]
    pub allow_audio_mute: bool, // Enable setting MuteControl
    #[packed_field(bits = "15")]
    pub allow_mute_light: bool, // Enable setting MuteLightMode
}

/// USB output report. The state after the valid flags is left zeroed, which
/// is enough to keep the controller in its reporting mode.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "63")]
pub struct UsbPackedOutputReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x02)

    // byte 1-2
    #[packed_field(bytes = "1..=2")]
    pub flags: SetStateValidFlags,

    // byte 3-62
    #[packed_field(bytes = "3..=62")]
    pub state: [u8; 60], // Rumble, triggers, audio and lights
}

impl UsbPackedOutputReport {
    /// Report that marks every state section as valid ("update everything")
    /// except the light reset, with all state values zeroed.
    pub fn keep_alive() -> Self {
        Self {
            report_id: OUTPUT_REPORT_USB,
            flags: SetStateValidFlags {
                allow_audio_control: true,
                allow_mic_volume: true,
                allow_speaker_volume: true,
                allow_headphone_volume: true,
                allow_left_trigger_ffb: true,
                allow_right_trigger_ffb: true,
                use_rumble_not_haptics: true,
                enable_rumble_emulation: true,
                allow_audio_control2: true,
                allow_motor_power_level: true,
                allow_haptic_low_pass_filter: true,
                allow_player_indicators: true,
                reset_lights: false,
                allow_led_color: true,
                allow_audio_mute: true,
                allow_mute_light: true,
            },
            state: [0; 60],
        }
    }
}

impl Default for UsbPackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: OUTPUT_REPORT_USB,
            flags: Default::default(),
            state: [0; 60],
        }
    }
}
