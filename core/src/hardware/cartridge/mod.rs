pub mod header;
mod mbc;
mod mbc1;
mod mbc3;
mod mbc5;

use crate::error::{GameboyError, Result};
use crate::hardware::cartridge::header::{CartridgeHeader, MbcKind};
use crate::hardware::cartridge::mbc::{Mbc, NoMbc, RAM_BANK_SIZE};
use crate::hardware::cartridge::mbc1::Mbc1;
use crate::hardware::cartridge::mbc3::Mbc3;
use crate::hardware::cartridge::mbc5::Mbc5;

/// Refuse to start on an unsupported MBC, or degrade to best-effort NoMBC
/// semantics and continue. Fixed here rather than left to the caller so the
/// two behaviours are never mixed within one load path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnsupportedMbcPolicy {
    Refuse,
    DegradeToNoMbc,
}

#[derive(Debug)]
pub struct Cartridge {
    pub header: CartridgeHeader,
    mbc: Box<dyn Mbc>,
}

/// Bytes appended after the RAM banks in an MBC3-with-RTC save file: ten
/// little-endian u32 RTC fields plus an 8-byte save-time trailer.
const MBC3_RTC_TAIL_SIZE: usize = 48;

impl Cartridge {
    pub fn new(rom: &[u8], saved_ram: Option<Vec<u8>>, policy: UnsupportedMbcPolicy, now_unix_seconds: u64) -> Result<Self> {
        if rom.len() < header::HEADER_END as usize {
            return Err(GameboyError::RomMalformed(format!(
                "ROM is only {} bytes, shorter than the header",
                rom.len()
            )));
        }
        let header = CartridgeHeader::new(rom);
        if !header.header_checksum_valid {
            log::warn!("cartridge '{}' has an invalid header checksum", header.title);
        }

        let rom_bank_count = header.rom_bank_count();
        let (ram_bank_count, ram_bank_size) = header.ram_bank_layout();
        if ram_bank_size != 0 && ram_bank_size != RAM_BANK_SIZE {
            log::warn!(
                "cartridge '{}' declares a {}-byte RAM bank, smaller than the usual 8 KiB",
                header.title,
                ram_bank_size
            );
        }
        let ram_bank_count = if ram_bank_size == RAM_BANK_SIZE { ram_bank_count } else { 0 };

        let rom = rom.to_vec();
        let mbc: Box<dyn Mbc> = match header.mbc_kind() {
            MbcKind::NoMbc => Box::new(NoMbc::new(rom, ram_bank_count as usize * RAM_BANK_SIZE, saved_ram)),
            MbcKind::Mbc1 => Box::new(Mbc1::new(rom, rom_bank_count, ram_bank_count, saved_ram)),
            MbcKind::Mbc3 { has_rtc } => {
                let ram_size = ram_bank_count as usize * RAM_BANK_SIZE;
                let (ram_part, tail_part) = match saved_ram {
                    Some(buf) if has_rtc && buf.len() >= ram_size + MBC3_RTC_TAIL_SIZE => {
                        let (ram, tail) = buf.split_at(ram_size);
                        (Some(ram.to_vec()), Some(tail.to_vec()))
                    }
                    other => (other, None),
                };
                let mut mbc3 = Mbc3::new(rom, rom_bank_count, ram_bank_count, has_rtc, ram_part);
                if let Some(tail) = tail_part {
                    mbc3.restore_rtc_tail(&tail, now_unix_seconds);
                }
                Box::new(mbc3)
            }
            MbcKind::Mbc5 => Box::new(Mbc5::new(rom, rom_bank_count, ram_bank_count, saved_ram)),
            unsupported => match policy {
                UnsupportedMbcPolicy::Refuse => {
                    return Err(GameboyError::UnsupportedMbc(format!("{:?}", unsupported)))
                }
                UnsupportedMbcPolicy::DegradeToNoMbc => {
                    log::warn!(
                        "cartridge '{}' uses unsupported MBC {:?}; continuing with best-effort NoMBC semantics",
                        header.title,
                        unsupported
                    );
                    Box::new(NoMbc::new(rom, ram_bank_count as usize * RAM_BANK_SIZE, saved_ram))
                }
            },
        };

        Ok(Cartridge { header, mbc })
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x7FFF => self.mbc.read_rom(address),
            0xA000..=0xBFFF => self.mbc.read_ram(address),
            _ => mbc::INVALID_READ,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x7FFF => self.mbc.write_rom(address, value),
            0xA000..=0xBFFF => self.mbc.write_ram(address, value),
            _ => {}
        }
    }

    pub fn tick_rtc(&mut self, clocks: u32) {
        self.mbc.tick_rtc(clocks);
    }

    pub fn fast_forward_rtc(&mut self, elapsed_seconds: u64) {
        self.mbc.fast_forward_rtc(elapsed_seconds);
    }

    /// Concatenation of all RAM banks, plus the MBC3 RTC tail when present.
    pub fn save_data(&self, now_unix_seconds: u64) -> Option<Vec<u8>> {
        let ram = self.mbc.battery_ram()?;
        let mut data = ram.to_vec();
        if let Some(tail) = self.mbc.save_tail(now_unix_seconds) {
            data.extend_from_slice(&tail);
        }
        Some(data)
    }
}
