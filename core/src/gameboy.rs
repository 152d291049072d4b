//! The top-level emulator loop: owns the CPU and bus, advances them in
//! lockstep, and exposes the narrow surface a host frontend polls once per
//! frame (§6 of the engine's design: present/queue-audio/poll-input/RTC).

use crate::error::{GameboyError, Result};
use crate::hardware::bus::{Bus, BusConfig};
use crate::hardware::cartridge::header::CartridgeHeader;
use crate::hardware::cartridge::UnsupportedMbcPolicy;
use crate::hardware::cpu::Cpu;
use crate::hardware::ppu::palette::Rgb;
use crate::io::joypad::InputKey;
use crate::HardwareMode;

/// Construction-time options threaded down from the host's CLI/config layer;
/// `core` never parses raw strings itself (see the crate-level options builder).
pub struct GameboyOptions {
    pub mode: HardwareMode,
    pub boot_rom: Option<Vec<u8>>,
    pub saved_ram: Option<Vec<u8>>,
    pub mbc_policy: UnsupportedMbcPolicy,
    pub now_unix_seconds: u64,
}

impl Default for GameboyOptions {
    fn default() -> Self {
        GameboyOptions {
            mode: HardwareMode::Auto,
            boot_rom: None,
            saved_ram: None,
            mbc_policy: UnsupportedMbcPolicy::DegradeToNoMbc,
            now_unix_seconds: 0,
        }
    }
}

pub struct Gameboy {
    cpu: Cpu,
    bus: Bus,
}

impl Gameboy {
    pub fn new(rom: &[u8], options: GameboyOptions) -> Result<Self> {
        let is_cgb = match options.mode {
            HardwareMode::Dmg => false,
            HardwareMode::Cgb => true,
            HardwareMode::Auto => rom.len() > 0x0143 && CartridgeHeader::new(rom).cgb_flag,
        };
        let has_boot_rom = options.boot_rom.is_some();

        let bus = Bus::new(BusConfig {
            rom: rom.to_vec(),
            saved_ram: options.saved_ram,
            mbc_policy: options.mbc_policy,
            boot_rom: options.boot_rom,
            is_cgb,
            now_unix_seconds: options.now_unix_seconds,
        })?;

        let mut cpu = Cpu::new();
        if !has_boot_rom {
            cpu.skip_boot_rom();
        }

        Ok(Gameboy { cpu, bus })
    }

    /// Executes exactly one CPU instruction (or interrupt dispatch, or a
    /// single HALT-idle clock) and fans the resulting clock delta out to the
    /// rest of the hardware. Returns the number of T-cycles consumed.
    pub fn step(&mut self) -> Result<u32> {
        let clocks = self.cpu.step(&mut self.bus)?;
        let peripheral_clocks = if self.bus.double_speed() { clocks / 2 } else { clocks };
        self.bus.tick(peripheral_clocks);
        Ok(clocks)
    }

    /// Runs `step` until a frame has been presented (LY reaches 144), then
    /// clears the presentation flag and returns. A host calls this once per
    /// vsync and then reads `frame_buffer`/`take_samples`/`poll_input`.
    pub fn run_frame(&mut self) -> Result<()> {
        while !self.bus.ppu.frame_presented {
            self.step()?;
        }
        self.bus.ppu.frame_presented = false;
        Ok(())
    }

    pub fn frame_buffer(&self) -> &[Rgb] {
        &self.bus.ppu.frame_buffer
    }

    /// Drains audio samples (interleaved stereo float32 at 44100 Hz)
    /// accumulated since the last call.
    pub fn take_samples(&mut self) -> Vec<f32> {
        self.bus.take_samples()
    }

    pub fn press_key(&mut self, key: InputKey) {
        self.bus.press_key(key);
    }

    pub fn release_key(&mut self, key: InputKey) {
        self.bus.release_key(key);
    }

    /// Concatenated battery RAM (plus MBC3 RTC tail, if present) for the host
    /// to persist to a save file. `now_unix_seconds` is stamped into the tail
    /// so a future load can fast-forward the RTC past the time it sat idle.
    pub fn save_data(&self, now_unix_seconds: u64) -> Option<Vec<u8>> {
        self.bus.save_data(now_unix_seconds)
    }

    pub fn is_cgb(&self) -> bool {
        self.bus.is_cgb()
    }

    /// Cartridge title from the ROM header, trimmed of padding. Handy for a
    /// host keying save files or window titles off the loaded game.
    pub fn game_title(&self) -> &str {
        self.bus.game_title()
    }
}

/// An opcode outside the instruction table was fetched; construction handed
/// back a `RomMalformed`/`UnsupportedMbc` before this is reachable, so a
/// caller only ever sees this from `step`.
pub fn illegal_opcode(opcode: u8, pc: u16) -> GameboyError {
    GameboyError::IllegalOpcode { opcode, pc }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        // NOP; NOP; JR -2 (spin in place so `step` never runs off the ROM).
        rom[0x100] = 0x00;
        rom[0x101] = 0x00;
        rom[0x102] = 0x18;
        rom[0x103] = 0xFC;
        rom
    }

    #[test]
    fn construction_detects_non_cgb_header() {
        let gb = Gameboy::new(&blank_rom(), GameboyOptions::default()).unwrap();
        assert!(!gb.is_cgb());
    }

    #[test]
    fn stepping_advances_clocks_without_error() {
        let mut gb = Gameboy::new(&blank_rom(), GameboyOptions::default()).unwrap();
        for _ in 0..10 {
            assert!(gb.step().unwrap() > 0);
        }
    }
}
