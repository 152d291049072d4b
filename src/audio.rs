//! Thin wrapper around an SDL audio queue. The engine produces interleaved
//! stereo f32 samples at 44100 Hz (see `boyemu_core::Gameboy::take_samples`);
//! this just owns the queue and applies a backpressure cap so a host that
//! falls behind on rendering doesn't let the queue grow without bound.

use anyhow::{anyhow, Result};
use sdl2::audio::{AudioQueue, AudioSpecDesired};
use sdl2::AudioSubsystem;

/// Above this many queued samples we drop newly produced audio rather than
/// queue it, so a slow host frame doesn't turn into ever-growing latency.
const MAX_QUEUED_SAMPLES: u32 = 44_100 * 2 / 2; // ~0.5s of stereo audio

pub struct AudioPlayer {
    queue: AudioQueue<f32>,
}

impl AudioPlayer {
    pub fn new(audio_subsystem: &AudioSubsystem) -> Result<Self> {
        let desired = AudioSpecDesired {
            freq: Some(44_100),
            channels: Some(2),
            samples: None,
        };
        let queue = audio_subsystem
            .open_queue(None, &desired)
            .map_err(|e| anyhow!("failed to open SDL audio queue: {e}"))?;
        queue.resume();
        Ok(AudioPlayer { queue })
    }

    pub fn queue(&self, samples: &[f32]) {
        if self.queue.size() >= MAX_QUEUED_SAMPLES {
            return;
        }
        let _ = self.queue.queue_audio(samples);
    }
}
