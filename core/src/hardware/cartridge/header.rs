use std::str::from_utf8;

pub const HEADER_START: u16 = 0x0100;
pub const HEADER_END: u16 = 0x014F;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MbcKind {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3 { has_rtc: bool },
    Mbc5,
    Mmm01,
    Mbc6,
    Mbc7,
    Unknown(u8),
}

impl MbcKind {
    pub fn from_cartridge_type(code: u8) -> Self {
        match code {
            0x00 | 0x08 | 0x09 | 0xFC | 0xFD => MbcKind::NoMbc,
            0x01..=0x03 => MbcKind::Mbc1,
            0x05 | 0x06 => MbcKind::Mbc2,
            0x0F | 0x10 => MbcKind::Mbc3 { has_rtc: true },
            0x11..=0x13 => MbcKind::Mbc3 { has_rtc: false },
            0x19..=0x1E => MbcKind::Mbc5,
            0x0B..=0x0D => MbcKind::Mmm01,
            0x20 => MbcKind::Mbc6,
            0x22 => MbcKind::Mbc7,
            other => MbcKind::Unknown(other),
        }
    }

    pub fn has_battery(self, code: u8) -> bool {
        matches!(
            code,
            0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct CartridgeHeader {
    /// Upper case ASCII; 16 characters on DMG, 11 or 15 on CGB, NUL-padded.
    pub title: String,
    /// CGB-capable flag (bit 7 of 0x0143); bit 6 ("PGB-only") is ignored.
    pub cgb_flag: bool,
    pub new_licensee_code: u16,
    pub sgb_flag: bool,
    pub cartridge_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub is_japanese: bool,
    pub old_licensee_code: u8,
    pub mask_rom_version_number: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
    pub header_checksum_valid: bool,
}

impl CartridgeHeader {
    pub fn new(rom: &[u8]) -> Self {
        let is_cgb_rom = read_cgb_flag(rom);
        let header_checksum = read_header_checksum(rom);
        CartridgeHeader {
            title: read_title(rom, is_cgb_rom),
            cgb_flag: is_cgb_rom,
            new_licensee_code: read_new_licensee(rom),
            sgb_flag: read_sgb_flag(rom),
            cartridge_type: read_cartridge_type(rom),
            rom_size_code: read_rom_size(rom),
            ram_size_code: read_ram_size(rom),
            is_japanese: read_dest_code(rom),
            old_licensee_code: read_old_licensee(rom),
            mask_rom_version_number: read_mask_rom_version(rom),
            header_checksum,
            global_checksum: read_global_checksum(rom),
            header_checksum_valid: header_checksum == compute_header_checksum(rom),
        }
    }

    pub fn mbc_kind(&self) -> MbcKind {
        MbcKind::from_cartridge_type(self.cartridge_type)
    }

    pub fn has_battery(&self) -> bool {
        self.mbc_kind().has_battery(self.cartridge_type)
    }

    /// Number of 16 KiB ROM banks; standard codes double from 2 up to 512, with
    /// three non-power-of-two codes used by a handful of titles.
    pub fn rom_bank_count(&self) -> u32 {
        match self.rom_size_code {
            0x52 => 72,
            0x53 => 80,
            0x54 => 96,
            code if code <= 0x08 => 2u32 << code,
            _ => 2,
        }
    }

    /// Number of external RAM banks and the size (in bytes) of each bank.
    pub fn ram_bank_layout(&self) -> (u32, usize) {
        match self.ram_size_code {
            0x00 => (0, 0),
            0x01 => (1, 2 * 1024),
            0x02 => (1, 8 * 1024),
            0x03 => (4, 8 * 1024),
            0x04 => (16, 8 * 1024),
            0x05 => (8, 8 * 1024),
            _ => (0, 0),
        }
    }
}

fn read_title(rom: &[u8], cgb_mode: bool) -> String {
    let slice = if cgb_mode { &rom[0x134..=0x13E] } else { &rom[0x134..=0x143] };

    from_utf8(slice)
        .unwrap_or("")
        .trim_end_matches(char::from(0))
        .to_owned()
}

fn read_cgb_flag(rom: &[u8]) -> bool {
    rom[0x143] & 0x80 != 0
}

fn read_new_licensee(rom: &[u8]) -> u16 {
    ((rom[0x144] as u16) << 8) | rom[0x145] as u16
}

fn read_sgb_flag(rom: &[u8]) -> bool {
    rom[0x146] == 0x03
}

fn read_cartridge_type(rom: &[u8]) -> u8 {
    rom[0x147]
}

fn read_rom_size(rom: &[u8]) -> u8 {
    rom[0x148]
}

fn read_ram_size(rom: &[u8]) -> u8 {
    rom[0x149]
}

fn read_dest_code(rom: &[u8]) -> bool {
    rom[0x14A] == 0x00
}

fn read_old_licensee(rom: &[u8]) -> u8 {
    rom[0x14B]
}

fn read_mask_rom_version(rom: &[u8]) -> u8 {
    rom[0x14C]
}

fn read_header_checksum(rom: &[u8]) -> u8 {
    rom[0x14D]
}

fn read_global_checksum(rom: &[u8]) -> u16 {
    ((rom[0x14E] as u16) << 8) | rom[0x14F] as u16
}

fn compute_header_checksum(rom: &[u8]) -> u8 {
    let mut x: u8 = 0;
    for byte in &rom[0x134..=0x14C] {
        x = x.wrapping_sub(*byte).wrapping_sub(1);
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_title() {
        let mut test = vec![0u8; 0x10000];
        for (loc, i) in [0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x20, 0x57, 0x6f, 0x72, 0x00, 0x00]
            .iter()
            .enumerate()
        {
            test[0x134 + loc] = *i;
        }
        assert_eq!("Hello Wor", read_title(&test, false));
    }

    #[test]
    fn test_mbc_kind_table() {
        assert_eq!(MbcKind::from_cartridge_type(0x00), MbcKind::NoMbc);
        assert_eq!(MbcKind::from_cartridge_type(0x01), MbcKind::Mbc1);
        assert_eq!(MbcKind::from_cartridge_type(0x10), MbcKind::Mbc3 { has_rtc: true });
        assert_eq!(MbcKind::from_cartridge_type(0x11), MbcKind::Mbc3 { has_rtc: false });
        assert_eq!(MbcKind::from_cartridge_type(0x1A), MbcKind::Mbc5);
        assert_eq!(MbcKind::from_cartridge_type(0x22), MbcKind::Mbc7);
    }

    #[test]
    fn test_header_checksum_matches_known_rom() {
        let mut rom = vec![0u8; 0x200];
        rom[0x147] = 0x00;
        let checksum = compute_header_checksum(&rom);
        rom[0x14D] = checksum;
        let header = CartridgeHeader::new(&rom);
        assert!(header.header_checksum_valid);
    }
}
