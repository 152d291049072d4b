use crate::hardware::apu::channel_features::{EnvelopeFeature, LengthFeature, SweepFeature, SweepOutcome};
use crate::hardware::apu::{no_length_tick_next_step, INVALID_READ};

/// CH1 and CH2 are identical square wave generators, save that CH2 has no
/// sweep unit. `has_sweep` gates the sweep-register writes and the sweep
/// tick so the same struct serves both.
#[derive(Debug)]
pub struct SquareChannel {
    pub length: LengthFeature,
    envelope: EnvelopeFeature,
    sweep: SweepFeature,
    has_sweep: bool,
    enabled: bool,
    frequency: u16,
    timer: u16,
    duty_select: usize,
    duty_position: usize,
    output_volume: u8,
}

impl SquareChannel {
    const DUTY_TABLE: [[u8; 8]; 4] = [
        [0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 1, 1, 1],
        [0, 1, 1, 1, 1, 1, 1, 0],
    ];

    pub fn new(has_sweep: bool) -> Self {
        SquareChannel {
            length: LengthFeature::new(64),
            envelope: EnvelopeFeature::default(),
            sweep: SweepFeature::default(),
            has_sweep,
            enabled: false,
            frequency: 0,
            timer: 0,
            duty_select: 0,
            duty_position: 0,
            output_volume: 0,
        }
    }

    pub fn output_volume(&self) -> u8 {
        if self.enabled {
            self.output_volume
        } else {
            0
        }
    }

    pub fn triggered(&self) -> bool {
        self.enabled
    }

    pub fn tick_timer(&mut self, clocks: u16) {
        let new_val = self.timer.saturating_sub(clocks);
        if new_val == 0 {
            self.timer = (2048 - self.frequency) * 4;
            self.duty_position = (self.duty_position + 1) % 8;
            self.output_volume = self.envelope.volume * Self::DUTY_TABLE[self.duty_select][self.duty_position];
        } else {
            self.timer = new_val;
        }
    }

    fn local_address(address: u16) -> u16 {
        if address >= 0x15 {
            address - 5
        } else {
            address
        }
    }

    pub fn read_register(&self, address: u16) -> u8 {
        match Self::local_address(address) {
            0x10 => {
                if self.has_sweep {
                    0x80 | self.sweep.read_register()
                } else {
                    INVALID_READ
                }
            }
            0x11 => 0x3F | ((self.duty_select as u8) << 6),
            0x12 => self.envelope.read_register(),
            0x13 => INVALID_READ,
            0x14 => 0xBF | if self.length.length_enable { 0x40 } else { 0 },
            _ => unreachable!("invalid square channel register: 0xFF{:02X}", address),
        }
    }

    pub fn write_register(&mut self, address: u16, value: u8, next_frame_sequencer_step: u8) {
        match Self::local_address(address) {
            0x10 => {
                if self.has_sweep {
                    self.sweep.write_register(value);
                }
            }
            0x11 => {
                self.duty_select = ((value & 0xC0) >> 6) as usize;
                self.length.write_register(value);
            }
            0x12 => {
                self.envelope.write_register(value);
                if self.envelope.volume_load == 0 && !self.envelope.envelope_add_mode {
                    self.enabled = false;
                }
            }
            0x13 => self.frequency = (self.frequency & 0x0700) | value as u16,
            0x14 => {
                let old_length_enable = self.length.length_enable;
                let no_length_next = no_length_tick_next_step(next_frame_sequencer_step);

                self.length.length_enable = value & 0x40 != 0;
                self.frequency = (self.frequency & 0xFF) | (((value & 0x07) as u16) << 8);

                if no_length_next {
                    self.length.second_half_enable_tick(&mut self.enabled, old_length_enable);
                }

                if value & 0x80 != 0 {
                    self.trigger(no_length_next);
                }
            }
            _ => unreachable!("invalid square channel register: 0xFF{:02X}", address),
        }
    }

    fn trigger(&mut self, next_step_no_length: bool) {
        self.enabled = true;
        self.length.trigger(next_step_no_length);
        self.envelope.trigger();
        self.timer = (2048 - self.frequency) * 4;

        if self.has_sweep {
            match self.sweep.trigger(self.frequency) {
                SweepOutcome::Disable => self.enabled = false,
                SweepOutcome::SetFrequency(f) => self.frequency = f,
                SweepOutcome::NoChange => {}
            }
        }

        if self.envelope.volume_load == 0 && !self.envelope.envelope_add_mode {
            self.enabled = false;
        }
    }

    pub fn tick_envelope(&mut self) {
        self.envelope.tick();
    }

    pub fn tick_length(&mut self) {
        self.length.tick(&mut self.enabled);
    }

    pub fn tick_sweep(&mut self) {
        if !self.has_sweep {
            return;
        }
        match self.sweep.tick() {
            SweepOutcome::Disable => self.enabled = false,
            SweepOutcome::SetFrequency(f) => self.frequency = f,
            SweepOutcome::NoChange => {}
        }
    }

    pub fn reset(&mut self, keep_length: bool) {
        let length = self.length;
        let has_sweep = self.has_sweep;
        *self = SquareChannel::new(has_sweep);
        if keep_length {
            self.length = length;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_reloads_timer_and_enables_channel() {
        let mut channel = SquareChannel::new(true);
        channel.write_register(0x12, 0xF0, 0); // max volume, no sweep
        channel.write_register(0x13, 0x00, 0);
        channel.write_register(0x14, 0x87, 0); // trigger, freq high bits = 7
        assert!(channel.triggered());
        assert_eq!(channel.timer, (2048 - 0x700) * 4);
    }

    #[test]
    fn zero_volume_and_no_add_mode_keeps_channel_disabled() {
        let mut channel = SquareChannel::new(false);
        channel.write_register(0x12, 0x00, 0); // volume 0, subtract mode
        channel.write_register(0x14, 0x80, 0);
        assert!(!channel.triggered());
    }
}
