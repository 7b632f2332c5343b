//! Pad data structure filled in by the system pad library on every read. The
//! layout is fixed by the system ABI and must match it exactly.

pub const BUTTON_L3: u32 = 0x0000_0002;
pub const BUTTON_R3: u32 = 0x0000_0004;
pub const BUTTON_OPTIONS: u32 = 0x0000_0008;
pub const BUTTON_UP: u32 = 0x0000_0010;
pub const BUTTON_RIGHT: u32 = 0x0000_0020;
pub const BUTTON_DOWN: u32 = 0x0000_0040;
pub const BUTTON_LEFT: u32 = 0x0000_0080;
pub const BUTTON_L2: u32 = 0x0000_0100;
pub const BUTTON_R2: u32 = 0x0000_0200;
pub const BUTTON_L1: u32 = 0x0000_0400;
pub const BUTTON_R1: u32 = 0x0000_0800;
pub const BUTTON_TRIANGLE: u32 = 0x0000_1000;
pub const BUTTON_CIRCLE: u32 = 0x0000_2000;
pub const BUTTON_CROSS: u32 = 0x0000_4000;
pub const BUTTON_SQUARE: u32 = 0x0000_8000;
pub const BUTTON_TOUCH_PAD: u32 = 0x0010_0000;
pub const BUTTON_INTERCEPTED: u32 = 0x8000_0000;

/// Human readable names for each button bit
pub const BUTTON_NAMES: [(u32, &str); 17] = [
    (BUTTON_L3, "L3"),
    (BUTTON_R3, "R3"),
    (BUTTON_OPTIONS, "OPTIONS"),
    (BUTTON_UP, "UP"),
    (BUTTON_RIGHT, "RIGHT"),
    (BUTTON_DOWN, "DOWN"),
    (BUTTON_LEFT, "LEFT"),
    (BUTTON_L2, "L2"),
    (BUTTON_R2, "R2"),
    (BUTTON_L1, "L1"),
    (BUTTON_R1, "R1"),
    (BUTTON_TRIANGLE, "TRIANGLE"),
    (BUTTON_CIRCLE, "CIRCLE"),
    (BUTTON_CROSS, "CROSS"),
    (BUTTON_SQUARE, "SQUARE"),
    (BUTTON_TOUCH_PAD, "TOUCH_PAD"),
    (BUTTON_INTERCEPTED, "INTERCEPTED"),
];

/// Returns the names of every button set in the given mask
pub fn button_names(buttons: u32) -> Vec<&'static str> {
    BUTTON_NAMES
        .iter()
        .filter(|(bit, _)| buttons & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogStick {
    pub x: u8,
    pub y: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogButtons {
    pub l2: u8,
    pub r2: u8,
    pub padding: [u8; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    pub id: u8,
    pub reserve: [u8; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchData {
    pub touch_num: u8,
    pub reserve: [u8; 3],
    pub reserve1: u32,
    pub touch: [TouchPoint; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtensionUnitData {
    pub extension_unit_id: u32,
    pub reserve: u8,
    pub data_length: u8,
    pub reserve2: [u8; 10],
    pub data: [u8; 10],
}

/// Controller state as the game sees it after a pad read
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbisPadData {
    pub buttons: u32,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub analog_buttons: AnalogButtons,
    pub orientation: Quaternion,
    pub acceleration: Vector3,
    pub angular_velocity: Vector3,
    pub touch_data: TouchData,
    pub connected: bool,
    pub timestamp: u64,
    pub extension_unit_data: ExtensionUnitData,
    pub connected_count: u8,
    pub reserve: [u8; 2],
    pub device_unique_data_len: u8,
    pub device_unique_data: [u8; 12],
}

impl OrbisPadData {
    /// Returns true if every bit of the given button mask is pressed
    pub fn is_pressed(&self, buttons: u32) -> bool {
        self.buttons & buttons == buttons
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, offset_of, size_of};

    use super::*;

    #[test]
    fn test_pad_data_layout() {
        assert_eq!(size_of::<OrbisPadData>(), 136);
        assert_eq!(align_of::<OrbisPadData>(), 8);
        assert_eq!(offset_of!(OrbisPadData, left_stick), 4);
        assert_eq!(offset_of!(OrbisPadData, analog_buttons), 8);
        assert_eq!(offset_of!(OrbisPadData, orientation), 12);
        assert_eq!(offset_of!(OrbisPadData, touch_data), 52);
        assert_eq!(offset_of!(OrbisPadData, connected), 76);
        assert_eq!(offset_of!(OrbisPadData, timestamp), 80);
        assert_eq!(offset_of!(OrbisPadData, extension_unit_data), 88);
        assert_eq!(offset_of!(OrbisPadData, connected_count), 116);
        assert_eq!(offset_of!(OrbisPadData, device_unique_data), 120);
    }

    #[test]
    fn test_button_names() {
        let names = button_names(BUTTON_CROSS | BUTTON_UP | BUTTON_TOUCH_PAD);
        assert_eq!(names, vec!["UP", "CROSS", "TOUCH_PAD"]);
        assert!(button_names(0).is_empty());
    }
}
