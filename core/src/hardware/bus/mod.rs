//! The system bus: ties the CPU's address space to cartridge, VRAM/WRAM/HRAM,
//! OAM, the PPU and APU, and the rest of the memory-mapped I/O registers.
//! Region dispatch mirrors the real memory map rather than any single owning
//! peripheral, which is why `Bus` holds VRAM and OAM directly instead of
//! asking the PPU for them.

mod dma;
mod hram;
mod wram;

use crate::error::Result;
use crate::hardware::bus::dma::{CgbSpeedSwitch, HdmaCommand};
use crate::hardware::cartridge::{Cartridge, UnsupportedMbcPolicy};
use crate::hardware::ppu::registers::{LcdControl, LcdStatus, Mode};
use crate::hardware::ppu::Ppu;
use crate::hardware::apu::Apu;
use crate::io::bootrom::BootRom;
use crate::io::interrupts::{Interrupt, InterruptFlags, InterruptState};
use crate::io::joypad::JoyPad;
use crate::io::timer::TimerRegisters;

pub use dma::{CgbSpeedSwitch as SpeedSwitch, Hdma, OamDma};
pub use hram::Hram;
pub use wram::Wram;

pub(crate) const INVALID_READ: u8 = 0xFF;

const VRAM_START: u16 = 0x8000;
const VRAM_END: u16 = 0x9FFF;

const WRAM_BANK_00_START: u16 = 0xC000;
const WRAM_BANK_00_END: u16 = 0xCFFF;
const WRAM_BANK_NN_START: u16 = 0xD000;
const WRAM_BANK_NN_END: u16 = 0xDFFF;
const ECHO_RAM_START: u16 = 0xE000;
const ECHO_RAM_END: u16 = 0xFDFF;

const OAM_START: u16 = 0xFE00;
const OAM_END: u16 = 0xFE9F;
const NOT_USABLE_START: u16 = 0xFEA0;
const NOT_USABLE_END: u16 = 0xFEFF;

const IO_START: u16 = 0xFF00;
const IO_END: u16 = 0xFF7F;

const HRAM_START: u16 = 0xFF80;
const HRAM_END: u16 = 0xFFFE;
const IE_REGISTER: u16 = 0xFFFF;

/// `Bus::new` constructor arguments: the cartridge ROM image, any persisted
/// save RAM, the MBC compatibility policy, an optional boot ROM image, and
/// whether the session is running in CGB mode.
pub struct BusConfig {
    pub rom: Vec<u8>,
    pub saved_ram: Option<Vec<u8>>,
    pub mbc_policy: UnsupportedMbcPolicy,
    pub boot_rom: Option<Vec<u8>>,
    pub is_cgb: bool,
    /// Wall-clock time at load, used to fast-forward an MBC3 RTC past however
    /// long the save sat unplayed.
    pub now_unix_seconds: u64,
}

#[derive(Debug)]
pub struct Bus {
    cartridge: Cartridge,
    vram: [[u8; 0x2000]; 2],
    vram_bank: u8,
    wram: Wram,
    oam: [u8; 0xA0],
    hram: Hram,
    boot_rom: BootRom,
    pub ppu: Ppu,
    apu: Apu,
    timer: TimerRegisters,
    joypad: JoyPad,
    pub interrupts: InterruptState,
    oam_dma: OamDma,
    hdma: Hdma,
    speed_switch: CgbSpeedSwitch,
    is_cgb: bool,
    serial_data: u8,
    serial_control: u8,
}

impl Bus {
    pub fn new(config: BusConfig) -> Result<Self> {
        Ok(Bus {
            cartridge: Cartridge::new(&config.rom, config.saved_ram, config.mbc_policy, config.now_unix_seconds)?,
            vram: [[0; 0x2000]; 2],
            vram_bank: 0,
            wram: Wram::new(),
            oam: [0; 0xA0],
            hram: Hram::new(),
            boot_rom: BootRom::new(config.boot_rom),
            ppu: Ppu::new(config.is_cgb),
            apu: Apu::new(),
            timer: TimerRegisters::default(),
            joypad: JoyPad::new(),
            interrupts: InterruptState::default(),
            oam_dma: OamDma::default(),
            hdma: Hdma::default(),
            speed_switch: CgbSpeedSwitch::default(),
            is_cgb: config.is_cgb,
            serial_data: 0,
            serial_control: 0,
        })
    }

    pub fn is_cgb(&self) -> bool {
        self.is_cgb
    }

    pub fn game_title(&self) -> &str {
        self.cartridge.header.title.trim()
    }

    pub fn speed_switch_armed(&self) -> bool {
        self.speed_switch.armed()
    }

    pub fn perform_speed_switch(&mut self) {
        self.speed_switch.perform_switch();
    }

    pub fn double_speed(&self) -> bool {
        self.speed_switch.double_speed
    }

    /// Drains audio samples accumulated since the last call.
    pub fn take_samples(&mut self) -> Vec<f32> {
        self.apu.take_samples()
    }

    /// Advances every peripheral by `clocks` T-cycles in lockstep, folding
    /// every interrupt source's output into `self.interrupts`.
    pub fn tick(&mut self, clocks: u32) {
        if let Some(flag) = self.timer.tick(clocks) {
            self.interrupts.request_flag(flag);
        }

        self.oam_dma.tick(clocks);

        let mode_before = self.ppu.stat.mode();
        let ppu_flags = self.ppu.tick(clocks, &self.vram, &self.oam);
        self.interrupts.request_flag(ppu_flags);
        let mode_after = self.ppu.stat.mode();
        if mode_before != Mode::HBlank && mode_after == Mode::HBlank {
            self.run_hdma_chunk();
        }

        self.apu.tick(clocks);
        self.cartridge.tick_rtc(clocks);
    }

    fn run_hdma_chunk(&mut self) {
        if let Some((source, destination)) = self.hdma.next_hblank_chunk() {
            self.copy_dma_chunk(source, destination, 0x10);
        }
    }

    fn copy_dma_chunk(&mut self, source: u16, destination: u16, length: u16) {
        for offset in 0..length {
            let value = self.read_for_dma(source.wrapping_add(offset));
            self.write_vram_byte(destination.wrapping_add(offset), value);
        }
    }

    /// OAM DMA and HDMA both read through the normal address space rather
    /// than the blocked view `read()` presents while a transfer is active.
    fn read_for_dma(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cartridge.read(address),
            VRAM_START..=VRAM_END => self.vram[self.vram_bank as usize][(address - VRAM_START) as usize],
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.read_bank_0(address),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.read_bank_n(address),
            _ => INVALID_READ,
        }
    }

    fn write_vram_byte(&mut self, address: u16, value: u8) {
        if (VRAM_START..=VRAM_END).contains(&address) {
            self.vram[self.vram_bank as usize][(address - VRAM_START) as usize] = value;
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        if self.boot_rom.is_mapped(address) {
            return self.boot_rom.read_byte(address);
        }

        if self.oam_dma.active() && !matches!(address, HRAM_START..=HRAM_END) && address != 0xFF46 {
            return INVALID_READ;
        }

        match address {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cartridge.read(address),
            VRAM_START..=VRAM_END => self.vram[self.vram_bank as usize][(address - VRAM_START) as usize],
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.read_bank_0(address),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.read_bank_n(address),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.read_echo_ram(address),
            OAM_START..=OAM_END => self.oam[(address - OAM_START) as usize],
            NOT_USABLE_START..=NOT_USABLE_END => {
                if self.ppu.stat.mode() == Mode::OamSearch || self.ppu.stat.mode() == Mode::Transfer {
                    INVALID_READ
                } else {
                    0x00
                }
            }
            IO_START..=IO_END => self.read_io(address),
            HRAM_START..=HRAM_END => self.hram.read_byte(address),
            IE_REGISTER => self.interrupts.enable.bits(),
            _ => INVALID_READ,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        if self.oam_dma.active() && !matches!(address, HRAM_START..=HRAM_END) && address != 0xFF46 {
            return;
        }

        match address {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cartridge.write(address, value),
            VRAM_START..=VRAM_END => self.vram[self.vram_bank as usize][(address - VRAM_START) as usize] = value,
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.write_bank_0(address, value),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.write_bank_n(address, value),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.write_echo_ram(address, value),
            OAM_START..=OAM_END => self.oam[(address - OAM_START) as usize] = value,
            NOT_USABLE_START..=NOT_USABLE_END => {}
            IO_START..=IO_END => self.write_io(address, value),
            HRAM_START..=HRAM_END => self.hram.set_byte(address, value),
            IE_REGISTER => self.interrupts.enable = InterruptFlags::from_bits_truncate(value),
            _ => {}
        }
    }

    fn read_io(&self, address: u16) -> u8 {
        match address {
            0xFF00 => self.joypad.get_register(),
            0xFF01 => self.serial_data,
            0xFF02 => self.serial_control,
            0xFF04 => self.timer.divider_register(),
            0xFF05 => self.timer.timer_counter,
            0xFF06 => self.timer.timer_modulo,
            0xFF07 => self.timer.timer_control.to_bits(),
            0xFF0F => self.interrupts.flags.bits(),
            0xFF10..=0xFF3F => self.apu.read_register(address),
            0xFF40 => self.ppu.lcdc.bits(),
            0xFF41 => self.ppu.stat.bits(),
            0xFF42 => self.ppu.scy,
            0xFF43 => self.ppu.scx,
            0xFF44 => self.ppu.ly,
            0xFF45 => self.ppu.lyc,
            0xFF46 => self.oam_dma.source_high(),
            0xFF47 => self.ppu.bgp.raw(),
            0xFF48 => self.ppu.obp0.raw(),
            0xFF49 => self.ppu.obp1.raw(),
            0xFF4A => self.ppu.wy,
            0xFF4B => self.ppu.wx,
            0xFF4D => self.speed_switch.read_key1(),
            0xFF4F => 0xFE | self.vram_bank,
            0xFF50 => if self.boot_rom.is_finished() { 0xFF } else { 0xFE },
            0xFF55 => self.hdma.read_control(),
            0xFF68 => self.ppu.bg_palette_ram.read_index(),
            0xFF69 => self.ppu.bg_palette_ram.read_data(),
            0xFF6A => self.ppu.obj_palette_ram.read_index(),
            0xFF6B => self.ppu.obj_palette_ram.read_data(),
            0xFF70 => self.wram.read_bank_select(),
            _ => INVALID_READ,
        }
    }

    fn write_io(&mut self, address: u16, value: u8) {
        match address {
            0xFF00 => {
                if let Some(flag) = self.joypad.set_register(value) {
                    self.interrupts.request_flag(flag);
                }
            }
            0xFF01 => self.serial_data = value,
            0xFF02 => self.serial_control = value,
            0xFF04 => self.timer.set_divider(),
            0xFF05 => self.timer.set_timer_counter(value),
            0xFF06 => self.timer.set_tma(value),
            0xFF07 => self.timer.set_timer_control(value),
            0xFF0F => self.interrupts.flags = InterruptFlags::from_bits_truncate(value),
            0xFF10..=0xFF3F => self.apu.write_register(address, value),
            0xFF40 => self.ppu.lcdc = LcdControl::from_bits_truncate(value),
            0xFF41 => {
                let mode_bits = self.ppu.stat.bits() & 0x07;
                self.ppu.stat = LcdStatus::from_bits_truncate((value & 0xF8) | mode_bits);
            }
            0xFF42 => self.ppu.scy = value,
            0xFF43 => self.ppu.scx = value,
            0xFF44 => {}
            0xFF45 => self.ppu.lyc = value,
            0xFF46 => self.start_oam_dma(value),
            0xFF47 => self.ppu.bgp = crate::hardware::ppu::palette::DmgPalette::new(value, crate::hardware::ppu::palette::DEFAULT_SHADES),
            0xFF48 => self.ppu.obp0 = crate::hardware::ppu::palette::DmgPalette::new(value, crate::hardware::ppu::palette::DEFAULT_SHADES),
            0xFF49 => self.ppu.obp1 = crate::hardware::ppu::palette::DmgPalette::new(value, crate::hardware::ppu::palette::DEFAULT_SHADES),
            0xFF4A => self.ppu.wy = value,
            0xFF4B => self.ppu.wx = value,
            0xFF4D => self.speed_switch.write_key1(value),
            0xFF4F => {
                if self.is_cgb {
                    self.vram_bank = value & 0x01;
                }
            }
            0xFF50 => self.boot_rom.write_disable(value),
            0xFF51 => self.hdma.set_source_high(value),
            0xFF52 => self.hdma.set_source_low(value),
            0xFF53 => self.hdma.set_destination_high(value),
            0xFF54 => self.hdma.set_destination_low(value),
            0xFF55 => self.start_hdma(value),
            0xFF68 => self.ppu.bg_palette_ram.write_index(value),
            0xFF69 => self.ppu.bg_palette_ram.write_data(value),
            0xFF6A => self.ppu.obj_palette_ram.write_index(value),
            0xFF6B => self.ppu.obj_palette_ram.write_data(value),
            0xFF70 => {
                if self.is_cgb {
                    self.wram.write_bank_select(value);
                }
            }
            _ => {}
        }
    }

    fn start_oam_dma(&mut self, value: u8) {
        self.oam_dma.start(value);
        let source_base = self.oam_dma.source_base();
        for offset in 0..0xA0u16 {
            self.oam[offset as usize] = self.read_for_dma(source_base.wrapping_add(offset));
        }
    }

    fn start_hdma(&mut self, value: u8) {
        match self.hdma.write_control(value) {
            HdmaCommand::Gdma(length) => {
                let source = self.hdma.source();
                let destination = self.hdma.destination();
                self.copy_dma_chunk(source, destination, length);
            }
            HdmaCommand::ArmHdma | HdmaCommand::Cancelled => {}
        }
    }

    pub fn press_key(&mut self, input: crate::io::joypad::InputKey) {
        if let Some(flag) = self.joypad.press_key(input) {
            self.interrupts.request_flag(flag);
        }
    }

    pub fn release_key(&mut self, input: crate::io::joypad::InputKey) {
        self.joypad.release_key(input);
    }

    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupts.request(interrupt);
    }

    pub fn save_data(&self, now_unix_seconds: u64) -> Option<Vec<u8>> {
        self.cartridge.save_data(now_unix_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bus() -> Bus {
        Bus::new(BusConfig {
            rom: vec![0u8; 0x8000],
            saved_ram: None,
            mbc_policy: UnsupportedMbcPolicy::DegradeToNoMbc,
            boot_rom: None,
            is_cgb: false,
            now_unix_seconds: 0,
        })
        .unwrap()
    }

    #[test]
    fn wram_echo_mirrors_bank_0() {
        let mut bus = test_bus();
        bus.write(0xC010, 0x42);
        assert_eq!(bus.read(0xE010), 0x42);
    }

    #[test]
    fn oam_dma_copies_160_bytes_and_blocks_wram_reads() {
        let mut bus = test_bus();
        bus.write(0xC000, 0xAB);
        bus.write(0xFF46, 0xC0);
        assert_eq!(bus.oam[0], 0xAB);
        assert_eq!(bus.read(0xC000), INVALID_READ);
        assert_eq!(bus.read(0xFF80), bus.hram.read_byte(0xFF80));
    }

    #[test]
    fn boot_rom_disable_write_is_sticky() {
        let mut bus = Bus::new(BusConfig {
            rom: vec![0u8; 0x8000],
            saved_ram: None,
            mbc_policy: UnsupportedMbcPolicy::DegradeToNoMbc,
            boot_rom: Some(vec![0x11; 0x100]),
            is_cgb: false,
            now_unix_seconds: 0,
        })
        .unwrap();
        assert!(bus.boot_rom.is_mapped(0x0000));
        bus.write(0xFF50, 0x01);
        assert!(!bus.boot_rom.is_mapped(0x0000));
    }

    #[test]
    fn gdma_copies_immediately_into_vram() {
        let mut bus = test_bus();
        bus.write(0xC100, 0x99);
        bus.write(0xFF51, 0xC1); // source high
        bus.write(0xFF52, 0x00); // source low
        bus.write(0xFF53, 0x80); // destination high -> 0x8000 region
        bus.write(0xFF54, 0x00); // destination low
        bus.write(0xFF55, 0x00); // one 16-byte chunk, GDMA
        assert_eq!(bus.read(0x8000), 0x99);
    }
}
