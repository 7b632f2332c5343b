use std::error::Error;
use std::fmt::Write;

use dualsense_bridge::drivers::dualsense::hid_report::PackedInputStateReport;
use dualsense_bridge::drivers::orbis_pad::pad_data::{button_names, OrbisPadData};
use dualsense_bridge::input::translator;

/// Decode a hex string into bytes. Whitespace and a leading "0x" on each
/// byte are ignored.
pub fn parse_hex(value: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut digits = String::with_capacity(value.len());
    for part in value.split_whitespace() {
        let part = part
            .strip_prefix("0x")
            .or_else(|| part.strip_prefix("0X"))
            .unwrap_or(part);
        digits.push_str(part);
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{value}'").into());
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for i in (0..digits.len()).step_by(2) {
        let byte = digits
            .get(i..i + 2)
            .ok_or_else(|| format!("Invalid hex in '{value}'"))?;
        bytes.push(u8::from_str_radix(byte, 16)?);
    }

    Ok(bytes)
}

/// Human readable summary of the pad data
pub fn format_pad(pad: &OrbisPadData) -> String {
    let mut out = String::new();
    let buttons = button_names(pad.buttons);
    let _ = write!(
        out,
        "buttons: {:#010x} [{}] left: ({}, {}) right: ({}, {}) l2: {} r2: {}",
        pad.buttons,
        buttons.join(", "),
        pad.left_stick.x,
        pad.left_stick.y,
        pad.right_stick.x,
        pad.right_stick.y,
        pad.analog_buttons.l2,
        pad.analog_buttons.r2,
    );
    out
}

pub fn handle_translate(report: &str) -> Result<(), Box<dyn Error>> {
    let raw = parse_hex(report)?;
    if let Err(e) = PackedInputStateReport::unpack(&raw) {
        return Err(format!("Unable to translate report: {e}").into());
    }

    let mut pad = OrbisPadData::default();
    translator::translate(&raw, &mut pad);
    println!("{}", format_pad(&pad));

    Ok(())
}
