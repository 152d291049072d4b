use bitflags::bitflags;

/// Bit index, priority, and handler-vector source for the five interrupt kinds.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub fn iter() -> impl Iterator<Item = Interrupt> {
        use Interrupt::*;
        [VBlank, LcdStat, Timer, Serial, Joypad].iter().copied()
    }

    pub fn handler_vector(self) -> u16 {
        0x40 + 8 * (self as u16)
    }

    pub fn flag(self) -> InterruptFlags {
        InterruptFlags::from_bits_truncate(1 << (self as u8))
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        const VBLANK  = 0b0000_0001;
        const LCD     = 0b0000_0010;
        const TIMER   = 0b0000_0100;
        const SERIAL  = 0b0000_1000;
        const JOYPAD  = 0b0001_0000;
        /// Not driven by any hardware line but present so reads return all-ones.
        const UNUSED  = 0b1110_0000;
    }
}

impl InterruptFlags {
    pub fn contains_interrupt(&self, interrupt: Interrupt) -> bool {
        self.contains(interrupt.flag())
    }
}

/// IE/IF pair plus the dispatch logic used by the CPU's interrupt-service step.
#[derive(Default, Debug, Clone)]
pub struct InterruptState {
    pub enable: InterruptFlags,
    pub flags: InterruptFlags,
}

impl InterruptState {
    pub fn request(&mut self, interrupt: Interrupt) {
        self.flags.insert(interrupt.flag());
    }

    pub fn request_flag(&mut self, flag: InterruptFlags) {
        self.flags.insert(flag);
    }

    /// Highest-priority pending and enabled interrupt, if any.
    pub fn pending(&self) -> Option<Interrupt> {
        Interrupt::iter().find(|i| self.enable.contains_interrupt(*i) && self.flags.contains_interrupt(*i))
    }

    pub fn any_pending(&self) -> bool {
        !(self.enable & self.flags).is_empty()
    }

    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.flags.remove(interrupt.flag());
    }
}

#[cfg(test)]
mod test {
    use super::Interrupt;
    use super::Interrupt::*;

    #[test]
    fn test_interrupt_order() {
        let ordered_array = [VBlank, LcdStat, Timer, Serial, Joypad];
        for (i, interrupt) in Interrupt::iter().enumerate() {
            assert_eq!(ordered_array[i], interrupt)
        }
    }

    #[test]
    fn test_handler_vectors() {
        assert_eq!(VBlank.handler_vector(), 0x40);
        assert_eq!(LcdStat.handler_vector(), 0x48);
        assert_eq!(Timer.handler_vector(), 0x50);
        assert_eq!(Serial.handler_vector(), 0x58);
        assert_eq!(Joypad.handler_vector(), 0x60);
    }
}
