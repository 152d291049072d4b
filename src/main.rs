//! Single-threaded SDL2 frontend: one loop drives the engine a frame at a
//! time and presents whatever comes out, with no cross-thread handoff and no
//! in-process debugger (see `boyemu_core` for that surface).

mod audio;
mod display;
mod options;

use anyhow::{Context, Result};
use boyemu_core::{Gameboy, GameboyOptions, HardwareMode, InputKey};
use directories::ProjectDirs;
use gumdrop::Options;
use log::LevelFilter;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use simplelog::{Config, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::audio::AudioPlayer;
use crate::options::AppOptions;

const FPS: u64 = 60;
const FRAME_DELAY: Duration = Duration::from_nanos(1_000_000_000 / FPS);

fn main() -> Result<()> {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed)
        .context("failed to initialise terminal logger")?;

    let options = AppOptions::parse_args_default_or_exit();
    if options.rom_path.is_empty() {
        anyhow::bail!("no ROM path given; pass one as a free argument, e.g. `boyemu path/to/game.gb`");
    }

    let rom = fs::read(&options.rom_path)
        .with_context(|| format!("failed to read ROM at {}", options.rom_path))?;

    let mode = match (options.force_dmg, options.force_cgb) {
        (true, true) => anyhow::bail!("--force-dmg and --force-cgb are mutually exclusive"),
        (true, false) => HardwareMode::Dmg,
        (false, true) => HardwareMode::Cgb,
        (false, false) => HardwareMode::Auto,
    };

    let boot_rom = match mode {
        HardwareMode::Cgb => options.cgb_boot_rom.as_ref(),
        _ => options.dmg_boot_rom.as_ref(),
    }
    .map(fs::read)
    .transpose()
    .context("failed to read boot ROM")?;

    let save_path = save_file_path(&options.rom_path)?;
    let saved_ram = fs::read(&save_path).ok();

    let mut gameboy = Gameboy::new(
        &rom,
        GameboyOptions {
            mode,
            boot_rom,
            saved_ram,
            mbc_policy: boyemu_core::UnsupportedMbcPolicy::DegradeToNoMbc,
            now_unix_seconds: unix_now(),
        },
    )
    .context("failed to construct the emulator")?;

    log::info!(
        "loaded '{}' ({})",
        gameboy.game_title(),
        if gameboy.is_cgb() { "CGB" } else { "DMG" }
    );

    let sdl_context = sdl2::init().map_err(|e| anyhow::anyhow!("SDL init failed: {e}"))?;
    let video_subsystem = sdl_context
        .video()
        .map_err(|e| anyhow::anyhow!("SDL video init failed: {e}"))?;
    let audio_subsystem = sdl_context
        .audio()
        .map_err(|e| anyhow::anyhow!("SDL audio init failed: {e}"))?;
    let audio_player = if options.mute { None } else { Some(AudioPlayer::new(&audio_subsystem)?) };

    let window = video_subsystem
        .window(&format!("Boyemu - {}", gameboy.game_title()), 480, 432)
        .position_centered()
        .resizable()
        .build()
        .context("failed to create window")?;
    let mut canvas = window.into_canvas().build().context("failed to create canvas")?;
    let mut texture = display::setup_canvas(&mut canvas);

    let mut event_pump = sdl_context
        .event_pump()
        .map_err(|e| anyhow::anyhow!("failed to create SDL event pump: {e}"))?;

    'mainloop: loop {
        let frame_start = Instant::now();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => break 'mainloop,
                Event::KeyDown { keycode: Some(key), repeat: false, .. } => {
                    if let Some(input) = keycode_to_input(key) {
                        gameboy.press_key(input);
                    }
                }
                Event::KeyUp { keycode: Some(key), .. } => {
                    if let Some(input) = keycode_to_input(key) {
                        gameboy.release_key(input);
                    }
                }
                _ => {}
            }
        }

        gameboy.run_frame().context("emulation step failed")?;
        display::present_frame(&mut canvas, &mut texture, gameboy.frame_buffer());

        let samples = gameboy.take_samples();
        if let Some(player) = &audio_player {
            player.queue(&samples);
        }

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DELAY {
            std::thread::sleep(FRAME_DELAY - elapsed);
        }
    }

    if let Some(data) = gameboy.save_data(unix_now()) {
        if let Some(parent) = save_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&save_path, data).context("failed to write save file")?;
    }

    Ok(())
}

fn save_file_path(rom_path: &str) -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "Boyemu", "Boyemu").context("could not resolve a data directory for saves")?;
    let stem = PathBuf::from(rom_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rom".to_string());
    Ok(dirs.data_dir().join("saves").join(format!("{stem}.sav")))
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn keycode_to_input(key: Keycode) -> Option<InputKey> {
    match key {
        Keycode::Up => Some(InputKey::Up),
        Keycode::Down => Some(InputKey::Down),
        Keycode::Left => Some(InputKey::Left),
        Keycode::Right => Some(InputKey::Right),
        Keycode::Z => Some(InputKey::A),
        Keycode::X => Some(InputKey::B),
        Keycode::Return => Some(InputKey::Start),
        Keycode::RShift => Some(InputKey::Select),
        _ => None,
    }
}
