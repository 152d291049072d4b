//! Joypad register handling.
//!
//! Input lines are active-low: a reported bit of 0 means the corresponding
//! key is held. `JOYPAD` is requested on any reported bit's 1-to-0 edge.

use crate::io::interrupts::InterruptFlags;
use bitflags::bitflags;

pub const JOYPAD_REGISTER: u16 = 0xFF00;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum InputKey {
    Start,
    Select,
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct JoyPad {
    pressed_buttons: JoypadFlags,
    pressed_directions: JoypadFlags,
    selected_mode: JoypadFlags,
}

impl JoyPad {
    pub fn new() -> Self {
        JoyPad {
            pressed_buttons: JoypadFlags::empty(),
            pressed_directions: JoypadFlags::empty(),
            selected_mode: JoypadFlags::from_bits_truncate(0xFF),
        }
    }

    /// Current JOYP value for the most recently selected key group(s).
    pub fn get_register(&self) -> u8 {
        !self.selected_mode.bits
    }

    /// Select which key group (buttons/directions) is reported; the lower
    /// nibble of a write is always discarded, it is read-only.
    pub fn set_register(&mut self, mode: u8) -> Option<InterruptFlags> {
        let before = self.get_register();
        self.selected_mode = JoypadFlags::from_bits_truncate(!mode);
        self.update_flags();
        self.edge_interrupt(before)
    }

    pub fn press_key(&mut self, input: InputKey) -> Option<InterruptFlags> {
        let before = self.get_register();
        use InputKey::*;
        match input {
            Down | Up | Left | Right => self.pressed_directions.insert(input.flag()),
            A | B | Select | Start => self.pressed_buttons.insert(input.flag()),
        }
        self.update_flags();
        self.edge_interrupt(before)
    }

    pub fn release_key(&mut self, input: InputKey) {
        use InputKey::*;
        match input {
            Down | Up | Left | Right => self.pressed_directions.remove(input.flag()),
            A | B | Select | Start => self.pressed_buttons.remove(input.flag()),
        }
        self.update_flags()
    }

    fn update_flags(&mut self) {
        // Discard any writes made to the lower (reporting) nibble.
        self.selected_mode = JoypadFlags::from_bits_truncate(self.selected_mode.bits() & 0b0011_0000);
        if self.selected_mode.contains(JoypadFlags::BUTTON_KEYS) {
            self.selected_mode.insert(self.pressed_buttons);
        }
        if self.selected_mode.contains(JoypadFlags::DIRECTION_KEYS) {
            self.selected_mode.insert(self.pressed_directions);
        }
    }

    /// A reported bit transitioning from 1 to 0 requests JOYPAD.
    fn edge_interrupt(&self, before: u8) -> Option<InterruptFlags> {
        let after = self.get_register();
        let fell = before & !after & 0x0F;
        if fell != 0 {
            Some(InterruptFlags::JOYPAD)
        } else {
            None
        }
    }
}

impl InputKey {
    fn flag(&self) -> JoypadFlags {
        match self {
            InputKey::Start | InputKey::Down => JoypadFlags::DOWN_START,
            InputKey::Select | InputKey::Up => JoypadFlags::UP_SELECT,
            InputKey::B | InputKey::Left => JoypadFlags::LEFT_B,
            InputKey::A | InputKey::Right => JoypadFlags::RIGHT_A,
        }
    }
}

bitflags! {
    #[derive(Default)]
    struct JoypadFlags: u8 {
        const RIGHT_A         = 0b0000_0001;
        const LEFT_B          = 0b0000_0010;
        const UP_SELECT       = 0b0000_0100;
        const DOWN_START      = 0b0000_1000;
        const DIRECTION_KEYS  = 0b0001_0000;
        const BUTTON_KEYS     = 0b0010_0000;
        const UNUSED_0        = 0b0100_0000;
        const UNUSED_1        = 0b1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressing_a_selected_key_requests_joypad() {
        let mut pad = JoyPad::new();
        pad.set_register(0b0010_0000); // select buttons
        let interrupt = pad.press_key(InputKey::A);
        assert_eq!(interrupt, Some(InterruptFlags::JOYPAD));
    }

    #[test]
    fn pressing_an_unselected_key_does_not_interrupt() {
        let mut pad = JoyPad::new();
        pad.set_register(0b0001_0000); // select directions only
        let interrupt = pad.press_key(InputKey::A);
        assert_eq!(interrupt, None);
    }
}
