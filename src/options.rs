//! Command-line options, parsed with `gumdrop` the same way the old
//! multi-window frontend did; this binary just has fewer knobs to expose.

use gumdrop::Options;

#[derive(Debug, Options)]
pub struct AppOptions {
    #[options(help = "print this help message")]
    pub help: bool,

    #[options(free, help = "path to the .gb/.gbc ROM to run")]
    pub rom_path: String,

    #[options(help = "path to a DMG boot ROM image; omit to skip straight to the cartridge")]
    pub dmg_boot_rom: Option<String>,

    #[options(help = "path to a CGB boot ROM image; omit to skip straight to the cartridge")]
    pub cgb_boot_rom: Option<String>,

    #[options(help = "force DMG (original Game Boy) hardware mode")]
    pub force_dmg: bool,

    #[options(help = "force CGB (Game Boy Color) hardware mode")]
    pub force_cgb: bool,

    #[options(help = "run with no audio device, useful over SSH or in CI")]
    pub mute: bool,
}
