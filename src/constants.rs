// MIT License - Copyright (c) 2026 Peter Wright
// Panel status codes

use serde::Serialize;

/// Human-readable text for a partition status code, as shown on the keypad's
/// lower display line.
///
/// This table is shared with existing web clients; do not reword entries.
pub fn status_text(code: u8) -> Option<&'static str> {
    let text = match code {
        0x01 => "Ready",
        0x02 => "Stay zones open",
        0x03 => "Zones open",
        0x04 => "Armed stay",
        0x05 => "Armed away",
        0x06 => "No entry delay",
        0x07 => "Failed to arm",
        0x08 => "Exit delay",
        0x09 => "No entry delay",
        0x0B => "Quick exit",
        0x0C => "Entry delay",
        0x0D => "Alarm memory",
        0x0E => "Not available",
        0x10 => "Keypad lockout",
        0x11 => "Alarm",
        0x12 => "Battery check",
        0x14 => "Auto-arm",
        0x15 => "Arming with bypass zones",
        0x16 => "No entry delay",
        0x17 => "Power saving",
        0x19 => "Alarm occurred",
        0x22 => "Recent closing",
        0x2F => "Keypad LCD test",
        0x33 => "Command output active",
        0x3D => "Disarmed",
        0x3E => "Disarmed",
        0x40 => "Keypad blanked",
        0x8A => "Activate zones",
        0x8B => "Quick exit",
        0x8E => "Invalid option",
        0x8F => "Invalid code",
        0x9E => "Enter * code",
        0x9F => "Access code",
        0xA0 => "Zone bypass",
        0xA1 => "Trouble menu",
        0xA2 => "Alarm memory",
        0xA3 => "Door chime on",
        0xA4 => "Door chime off",
        0xA5 => "Master code",
        0xA6 => "Access codes",
        0xA7 => "Enter new code",
        0xA9 => "User function",
        0xAA => "Time and date",
        0xAB => "Auto-arm time",
        0xAC => "Auto-arm on",
        0xAD => "Auto-arm off",
        0xAF => "System test",
        0xB0 => "Enable DLS",
        0xB2 => "Command output",
        0xB3 => "Command output",
        0xB7 => "Installer code",
        0xB8 => "Enter * code",
        0xB9 => "Zone tamper",
        0xBA => "Zones low battery",
        0xBC => "Enter new code",
        0xBF => "Auto-arm day",
        0xC6 => "Zone fault menu",
        0xC8 => "Service required",
        0xCD => "Downloading",
        0xCE => "Camera monitor",
        0xD0 => "Keypads low battery",
        0xD1 => "Keyfobs low battery",
        0xD4 => "Sensors RF delinquency",
        0xE4 => "Installer programming",
        0xE5 => "Keypad slot",
        0xE6 => "Input: 2 digits",
        0xE7 => "Input: 3 digits",
        0xE8 => "Input: 4 digits",
        0xE9 => "Input: 5 digits",
        0xEA => "Input hex: 2 digits",
        0xEB => "Input hex: 4 digits",
        0xEC => "Input hex: 6 digits",
        0xED => "Input hex: 32 digits",
        0xEE => "Input: 1 option per zone",
        0xEF => "Module supervision",
        0xF0 => "Function key 1",
        0xF1 => "Function key 2",
        0xF2 => "Function key 3",
        0xF3 => "Function key 4",
        0xF4 => "Function key 5",
        0xF5 => "Wireless module test",
        0xF6 => "Activate device",
        0xF7 => "Installer programming",
        0xF8 => "Keypad programming",
        0xFA => "Input: 6 digits",
        _ => return None,
    };
    Some(text)
}

/// What the keypad display shows for a status code: mapped text, or the raw
/// code when the table has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusText {
    Text(&'static str),
    Code(u8),
}

impl StatusText {
    pub fn for_code(code: u8) -> Self {
        status_text(code).map_or(Self::Code(code), Self::Text)
    }
}

impl std::fmt::Display for StatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}
