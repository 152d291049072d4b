use bitflags::bitflags;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    HBlank,
    VBlank,
    OamSearch,
    Transfer,
}

bitflags! {
    /// FF40, LCDC. Never locked against CPU access, unlike VRAM/OAM during mode 3.
    #[derive(Default)]
    pub struct LcdControl: u8 {
        const BG_WINDOW_ENABLE      = 0b0000_0001;
        const OBJ_ENABLE            = 0b0000_0010;
        const OBJ_SIZE_8X16         = 0b0000_0100;
        const BG_TILE_MAP_SELECT    = 0b0000_1000;
        const BG_WINDOW_TILE_SELECT = 0b0001_0000;
        const WINDOW_ENABLE         = 0b0010_0000;
        const WINDOW_TILE_MAP_SELECT = 0b0100_0000;
        const LCD_ENABLE            = 0b1000_0000;
    }
}

bitflags! {
    /// FF41, STAT. Bits 0-2 are read-only mode/coincidence state; bits 3-6 are
    /// the per-source interrupt enables the aggregate STAT line ORs together.
    #[derive(Default)]
    pub struct LcdStatus: u8 {
        const MODE_LOW    = 0b0000_0001;
        const MODE_HIGH   = 0b0000_0010;
        const LYC_EQUAL   = 0b0000_0100;
        const HBLANK_INT  = 0b0000_1000;
        const VBLANK_INT  = 0b0001_0000;
        const OAM_INT     = 0b0010_0000;
        const LYC_INT     = 0b0100_0000;
        const UNUSED      = 0b1000_0000;
    }
}

impl LcdStatus {
    pub fn mode(&self) -> Mode {
        match self.bits() & 0x3 {
            0 => Mode::HBlank,
            1 => Mode::VBlank,
            2 => Mode::OamSearch,
            _ => Mode::Transfer,
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        let bits = match mode {
            Mode::HBlank => 0,
            Mode::VBlank => 1,
            Mode::OamSearch => 2,
            Mode::Transfer => 3,
        };
        self.remove(LcdStatus::MODE_LOW | LcdStatus::MODE_HIGH);
        self.insert(LcdStatus::from_bits_truncate(bits));
    }
}

bitflags! {
    /// CGB per-tile attribute byte, read from VRAM bank 1.
    #[derive(Default)]
    pub struct TileAttributes: u8 {
        const PALETTE    = 0b0000_0111;
        const VRAM_BANK  = 0b0000_1000;
        const X_FLIP     = 0b0010_0000;
        const Y_FLIP     = 0b0100_0000;
        const BG_PRIORITY = 0b1000_0000;
    }
}

impl TileAttributes {
    pub fn palette_index(self) -> usize {
        (self.bits() & 0x07) as usize
    }
}

bitflags! {
    /// OAM sprite attribute byte.
    #[derive(Default)]
    pub struct SpriteFlags: u8 {
        const CGB_PALETTE     = 0b0000_0111;
        const CGB_VRAM_BANK   = 0b0000_1000;
        const DMG_PALETTE     = 0b0001_0000;
        const X_FLIP          = 0b0010_0000;
        const Y_FLIP          = 0b0100_0000;
        const BG_OVER_OBJ     = 0b1000_0000;
    }
}
