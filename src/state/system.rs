// MIT License - Copyright (c) 2026 Peter Wright
// Panel-wide state: power, battery and keypad alarm buttons

use crate::state::edge::{Edge, OneShot};

/// Power supply state for the whole panel.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    /// AC power trouble
    pub power_trouble: Edge<bool>,
    /// Backup battery trouble
    pub battery_trouble: Edge<bool>,
}

/// Momentary keypad alarm buttons. Each press is reported once.
#[derive(Debug, Clone, Default)]
pub struct KeypadAlarms {
    pub fire: OneShot,
    pub aux: OneShot,
    pub panic: OneShot,
}

/// Which keypad alarm button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypadButton {
    Fire,
    Aux,
    Panic,
}

impl KeypadAlarms {
    pub fn press(&mut self, button: KeypadButton) {
        match button {
            KeypadButton::Fire => self.fire.raise(),
            KeypadButton::Aux => self.aux.raise(),
            KeypadButton::Panic => self.panic.raise(),
        }
    }

    pub fn any_raised(&self) -> bool {
        self.fire.is_raised() || self.aux.is_raised() || self.panic.is_raised()
    }
}
