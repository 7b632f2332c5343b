//! Translates DualSense USB input reports into the pad data the game reads.
use crate::drivers::{
    dualsense::hid_report::{Direction, PackedInputStateReport},
    orbis_pad::pad_data::*,
};

/// Overwrite the given pad data with the state carried by a raw DualSense
/// input report. Returns false and leaves the pad data untouched if the
/// report is too short or is not a standard input report.
///
/// Every button is rewritten on each call, so applying the same report twice
/// yields the same result.
pub fn translate(raw: &[u8], pad: &mut OrbisPadData) -> bool {
    let Ok(state) = PackedInputStateReport::unpack(raw) else {
        return false;
    };
    apply(&state, pad);
    true
}

/// Write an already decoded input report to the given pad data
pub fn apply(state: &PackedInputStateReport, pad: &mut OrbisPadData) {
    pad.buttons = buttons(state);
    pad.left_stick.x = state.joystick_l_x;
    pad.left_stick.y = state.joystick_l_y;
    pad.right_stick.x = state.joystick_r_x;
    pad.right_stick.y = state.joystick_r_y;
    pad.analog_buttons.l2 = state.l2_trigger;
    pad.analog_buttons.r2 = state.r2_trigger;
    pad.connected = true;
}

/// Button mask for the given input report
pub fn buttons(state: &PackedInputStateReport) -> u32 {
    let mut buttons = dpad_buttons(state.direction());

    // Face buttons
    if state.square {
        buttons |= BUTTON_SQUARE;
    }
    if state.cross {
        buttons |= BUTTON_CROSS;
    }
    if state.circle {
        buttons |= BUTTON_CIRCLE;
    }
    if state.triangle {
        buttons |= BUTTON_TRIANGLE;
    }

    // Shoulders, triggers and sticks. The create button has no equivalent.
    if state.l1 {
        buttons |= BUTTON_L1;
    }
    if state.r1 {
        buttons |= BUTTON_R1;
    }
    if state.l2 {
        buttons |= BUTTON_L2;
    }
    if state.r2 {
        buttons |= BUTTON_R2;
    }
    if state.options {
        buttons |= BUTTON_OPTIONS;
    }
    if state.l3 {
        buttons |= BUTTON_L3;
    }
    if state.r3 {
        buttons |= BUTTON_R3;
    }

    // System buttons
    if state.touchpad {
        buttons |= BUTTON_TOUCH_PAD;
    }
    if state.ps {
        buttons |= BUTTON_INTERCEPTED;
    }

    buttons
}

/// D-pad bits for the given hat switch direction
pub fn dpad_buttons(direction: Option<Direction>) -> u32 {
    match direction {
        Some(Direction::North) => BUTTON_UP,
        Some(Direction::NorthEast) => BUTTON_UP | BUTTON_RIGHT,
        Some(Direction::East) => BUTTON_RIGHT,
        Some(Direction::SouthEast) => BUTTON_RIGHT | BUTTON_DOWN,
        Some(Direction::South) => BUTTON_DOWN,
        Some(Direction::SouthWest) => BUTTON_DOWN | BUTTON_LEFT,
        Some(Direction::West) => BUTTON_LEFT,
        Some(Direction::NorthWest) => BUTTON_LEFT | BUTTON_UP,
        Some(Direction::None) | None => 0,
    }
}
