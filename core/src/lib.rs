//! The emulation engine: CPU, memory bus, cartridge/MBC, PPU, APU, and the
//! timer/joypad/interrupt glue that ties them together at a deterministic
//! clock rate. No windowing, audio device, or CLI dependencies live here —
//! see the root package for the host frontend that drives a [`Gameboy`].

pub mod error;
pub mod gameboy;
pub mod hardware;
pub mod io;

pub use crate::error::{GameboyError, Result};
pub use crate::gameboy::{Gameboy, GameboyOptions};
pub use crate::hardware::cartridge::UnsupportedMbcPolicy;
pub use crate::hardware::ppu::palette::Rgb;
pub use crate::hardware::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
pub use crate::io::joypad::InputKey;

/// Which hardware the engine emulates. `Auto` inspects the cartridge header's
/// CGB-support flag at load time, matching what real hardware does when a
/// CGB-enhanced cartridge is inserted into a backwards-compatible console.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HardwareMode {
    Dmg,
    Cgb,
    Auto,
}

impl Default for HardwareMode {
    fn default() -> Self {
        HardwareMode::Auto
    }
}
