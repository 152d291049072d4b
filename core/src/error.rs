//! Error types returned at the boundaries of the emulation core.
//!
//! Construction (ROM/boot-ROM loading, header parsing) returns `Result<_, GameboyError>`.
//! The only runtime-fatal case, an illegal opcode fetch, is surfaced through the
//! `Result` of the top-level step function rather than a panic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameboyError {
    #[error("cartridge ROM is malformed: {0}")]
    RomMalformed(String),

    #[error("failed to read ROM data: {0}")]
    RomIo(String),

    #[error("out of memory allocating {0}")]
    OutOfMemory(String),

    #[error("illegal opcode 0x{opcode:02X} fetched at PC=0x{pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    #[error("unsupported memory bank controller: {0}")]
    UnsupportedMbc(String),

    #[error("host audio device failed to initialise: {0}")]
    AudioInitFailed(String),

    #[error("host video device failed to initialise: {0}")]
    VideoInitFailed(String),
}

pub type Result<T> = std::result::Result<T, GameboyError>;
