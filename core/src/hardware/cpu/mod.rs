//! The Sharp LR35902 core: registers, opcode decode/execute, interrupt
//! servicing and the HALT/STOP/EI/DI state machine. `Cpu` holds no reference
//! to the bus it runs against; every step is handed one explicitly.

pub mod alu;
pub mod decode;
pub mod instruction;
pub mod operand;

use crate::error::{GameboyError, Result};
use crate::hardware::bus::Bus;
use crate::hardware::cpu::decode::{decode, decode_prefixed, Fetcher};
use crate::hardware::cpu::instruction::{AluOp, Direction, Instruction, RotateOp};
use crate::hardware::cpu::operand::{Indirect, MemAddress, Operand8};
use crate::hardware::registers::Registers;
use crate::io::interrupts::InterruptFlags;

#[derive(Debug, Default, Clone)]
pub struct Cpu {
    pub registers: Registers,
    pub ime: bool,
    ime_pending_set: bool,
    pub halted: bool,
    halt_bug: bool,
    /// Set by `STOP` when it did not merely arm a CGB speed switch; cleared
    /// the moment a joypad line goes low, the only wake source on real hardware.
    pub stopped: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu::default()
    }

    /// Registers as they read immediately after the DMG boot ROM hands off
    /// control at `0x0100`, for use when no boot ROM image was supplied.
    pub fn skip_boot_rom(&mut self) {
        self.registers.set_af(0x01B0);
        self.registers.set_bc(0x0013);
        self.registers.set_de(0x00D8);
        self.registers.set_hl(0x014D);
        self.registers.sp = 0xFFFE;
        self.registers.pc = 0x0100;
    }

    /// Advances the CPU by exactly one instruction (or one interrupt
    /// dispatch, or one halted/stopped no-op) and returns the elapsed clocks.
    pub fn step(&mut self, bus: &mut Bus) -> Result<u32> {
        if let Some(clocks) = self.service_interrupt(bus) {
            return Ok(clocks);
        }

        if self.stopped {
            if bus.interrupts.flags.contains(InterruptFlags::JOYPAD) {
                self.stopped = false;
            } else {
                return Ok(4);
            }
        }

        if self.halted {
            if bus.interrupts.any_pending() {
                self.halted = false;
            } else {
                return Ok(4);
            }
        }

        let mut pc = self.registers.pc;
        let opcode = if self.halt_bug {
            self.halt_bug = false;
            bus.read(pc)
        } else {
            let value = bus.read(pc);
            pc = pc.wrapping_add(1);
            value
        };

        let (instruction, nominal, alt) = if opcode == 0xCB {
            let cb_opcode = bus.read(pc);
            pc = pc.wrapping_add(1);
            let (instr, clocks) = decode_prefixed(cb_opcode);
            (instr, clocks, clocks)
        } else {
            let mut fetch8 = || {
                let value = bus.read(pc);
                pc = pc.wrapping_add(1);
                value
            };
            let mut fetcher = Fetcher { fetch8: &mut fetch8 };
            decode(opcode, &mut fetcher)
        };

        if let Instruction::IllegalOpcode(raw) = instruction {
            return Err(GameboyError::IllegalOpcode { opcode: raw, pc: self.registers.pc });
        }

        self.registers.pc = pc;
        let taken = self.execute(instruction, bus);

        if self.ime_pending_set {
            self.ime = true;
            self.ime_pending_set = false;
        }

        Ok(if taken { nominal as u32 } else { alt as u32 })
    }

    fn service_interrupt(&mut self, bus: &mut Bus) -> Option<u32> {
        if !self.ime {
            return None;
        }
        let interrupt = bus.interrupts.pending()?;
        bus.interrupts.acknowledge(interrupt);
        self.ime = false;
        self.halted = false;
        self.push16(bus, self.registers.pc);
        self.registers.pc = interrupt.handler_vector();
        Some(20)
    }

    fn push16(&mut self, bus: &mut Bus, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(2);
        bus.write(self.registers.sp, value as u8);
        bus.write(self.registers.sp.wrapping_add(1), (value >> 8) as u8);
    }

    fn pop16(&mut self, bus: &mut Bus) -> u16 {
        let lo = bus.read(self.registers.sp) as u16;
        let hi = bus.read(self.registers.sp.wrapping_add(1)) as u16;
        self.registers.sp = self.registers.sp.wrapping_add(2);
        (hi << 8) | lo
    }

    fn read_operand8(&self, bus: &Bus, operand: Operand8) -> u8 {
        match operand {
            Operand8::Reg(r) => self.registers.read_8(r),
            Operand8::Immediate(v) => v,
            Operand8::HlIndirect => bus.read(self.registers.hl()),
        }
    }

    fn write_operand8(&mut self, bus: &mut Bus, operand: Operand8, value: u8) {
        match operand {
            Operand8::Reg(r) => self.registers.write_8(r, value),
            Operand8::Immediate(_) => unreachable!("immediates are never write destinations"),
            Operand8::HlIndirect => bus.write(self.registers.hl(), value),
        }
    }

    fn apply_rotate(&mut self, op: RotateOp, value: u8) -> u8 {
        match op {
            RotateOp::Rlc => alu::rotate_left(&mut self.registers, value),
            RotateOp::Rrc => alu::rotate_right(&mut self.registers, value),
            RotateOp::Rl => alu::rotate_left_carry(&mut self.registers, value),
            RotateOp::Rr => alu::rotate_right_carry(&mut self.registers, value),
            RotateOp::Sla => alu::shift_left_arithmetic(&mut self.registers, value),
            RotateOp::Sra => alu::shift_right_arithmetic(&mut self.registers, value),
            RotateOp::Swap => alu::swap(&mut self.registers, value),
            RotateOp::Srl => alu::shift_right_logical(&mut self.registers, value),
        }
    }

    fn apply_alu(&mut self, op: AluOp, value: u8) {
        let a = self.registers.a;
        let result = match op {
            AluOp::Add => alu::add8(&mut self.registers, a, value),
            AluOp::Adc => alu::adc8(&mut self.registers, a, value),
            AluOp::Sub => alu::sub8(&mut self.registers, a, value),
            AluOp::Sbc => alu::sbc8(&mut self.registers, a, value),
            AluOp::And => alu::and8(&mut self.registers, a, value),
            AluOp::Xor => alu::xor8(&mut self.registers, a, value),
            AluOp::Or => alu::or8(&mut self.registers, a, value),
            AluOp::Cp => {
                alu::cp8(&mut self.registers, a, value);
                a
            }
        };
        if op != AluOp::Cp {
            self.registers.a = result;
        }
    }

    /// Executes the decoded instruction. Returns whether a conditional
    /// branch/call/return was taken (irrelevant, and always `true`, for
    /// unconditional instructions); `step` uses this to pick nominal vs.
    /// alternate duration.
    fn execute(&mut self, instruction: Instruction, bus: &mut Bus) -> bool {
        match instruction {
            Instruction::Nop => true,
            Instruction::Halt => {
                if !self.ime && bus.interrupts.any_pending() {
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
                true
            }
            Instruction::Stop(_) => {
                if bus.speed_switch_armed() {
                    bus.perform_speed_switch();
                } else {
                    self.stopped = true;
                }
                true
            }
            Instruction::DisableInterrupts => {
                self.ime = false;
                self.ime_pending_set = false;
                true
            }
            Instruction::EnableInterrupts => {
                self.ime_pending_set = true;
                true
            }

            Instruction::Load8 { dst, src } => {
                let value = self.read_operand8(bus, src);
                self.write_operand8(bus, dst, value);
                true
            }
            Instruction::LoadIndirect { indirect, direction } => {
                let address = match indirect {
                    Indirect::Bc => self.registers.bc(),
                    Indirect::De => self.registers.de(),
                    Indirect::HlIncrement => {
                        let hl = self.registers.hl();
                        self.registers.set_hl(hl.wrapping_add(1));
                        hl
                    }
                    Indirect::HlDecrement => {
                        let hl = self.registers.hl();
                        self.registers.set_hl(hl.wrapping_sub(1));
                        hl
                    }
                };
                match direction {
                    Direction::FromA => bus.write(address, self.registers.a),
                    Direction::IntoA => self.registers.a = bus.read(address),
                }
                true
            }
            Instruction::LoadHigh { addr, direction } => {
                let address = match addr {
                    MemAddress::HighC => 0xFF00 + self.registers.c as u16,
                    MemAddress::HighImmediate(n) => 0xFF00 + n as u16,
                    MemAddress::Absolute(a) => a,
                };
                match direction {
                    Direction::FromA => bus.write(address, self.registers.a),
                    Direction::IntoA => self.registers.a = bus.read(address),
                }
                true
            }
            Instruction::Load16 { dst, value } => {
                self.registers.write_16(dst, value);
                true
            }
            Instruction::LoadSpToHl(offset) => {
                let sp = self.registers.sp;
                let result = alu::add_sp_e8(&mut self.registers, sp, offset);
                self.registers.set_hl(result);
                true
            }
            Instruction::LoadHlToSp => {
                self.registers.sp = self.registers.hl();
                true
            }
            Instruction::LoadAbsoluteSp(address) => {
                let sp = self.registers.sp;
                bus.write(address, sp as u8);
                bus.write(address.wrapping_add(1), (sp >> 8) as u8);
                true
            }
            Instruction::Push(reg) => {
                let value = self.registers.read_16(reg);
                self.push16(bus, value);
                true
            }
            Instruction::Pop(reg) => {
                let value = self.pop16(bus);
                self.registers.write_16(reg, value);
                true
            }

            Instruction::Alu8 { op, operand } => {
                let value = self.read_operand8(bus, operand);
                self.apply_alu(op, value);
                true
            }
            Instruction::Inc8(operand) => {
                let value = self.read_operand8(bus, operand);
                let result = alu::inc8(&mut self.registers, value);
                self.write_operand8(bus, operand, result);
                true
            }
            Instruction::Dec8(operand) => {
                let value = self.read_operand8(bus, operand);
                let result = alu::dec8(&mut self.registers, value);
                self.write_operand8(bus, operand, result);
                true
            }
            Instruction::Inc16(reg) => {
                let value = self.registers.read_16(reg);
                self.registers.write_16(reg, value.wrapping_add(1));
                true
            }
            Instruction::Dec16(reg) => {
                let value = self.registers.read_16(reg);
                self.registers.write_16(reg, value.wrapping_sub(1));
                true
            }
            Instruction::AddHl(reg) => {
                let value = self.registers.read_16(reg);
                let hl = self.registers.hl();
                let result = alu::add16(&mut self.registers, hl, value);
                self.registers.set_hl(result);
                true
            }
            Instruction::AddSp(offset) => {
                let sp = self.registers.sp;
                self.registers.sp = alu::add_sp_e8(&mut self.registers, sp, offset);
                true
            }

            Instruction::RotateA(op) => {
                let value = self.registers.a;
                let result = self.apply_rotate(op, value);
                self.registers.a = result;
                alu::clear_zero_flag(&mut self.registers);
                true
            }
            Instruction::Rotate { op, operand } => {
                let value = self.read_operand8(bus, operand);
                let result = self.apply_rotate(op, value);
                self.write_operand8(bus, operand, result);
                true
            }
            Instruction::Bit { bit, operand } => {
                let value = self.read_operand8(bus, operand);
                alu::bit_test(&mut self.registers, bit, value);
                true
            }
            Instruction::Res { bit, operand } => {
                let value = self.read_operand8(bus, operand);
                self.write_operand8(bus, operand, alu::res(bit, value));
                true
            }
            Instruction::Set { bit, operand } => {
                let value = self.read_operand8(bus, operand);
                self.write_operand8(bus, operand, alu::set_bit(bit, value));
                true
            }

            Instruction::Daa => {
                self.registers.a = alu::daa(&mut self.registers, self.registers.a);
                true
            }
            Instruction::Cpl => {
                self.registers.a = alu::cpl(&mut self.registers, self.registers.a);
                true
            }
            Instruction::Scf => {
                alu::scf(&mut self.registers);
                true
            }
            Instruction::Ccf => {
                alu::ccf(&mut self.registers);
                true
            }

            Instruction::Jp(cond, target) => {
                let met = cond.is_met(self.registers.zf(), self.registers.cf());
                if met {
                    self.registers.pc = target;
                }
                met
            }
            Instruction::JpHl => {
                self.registers.pc = self.registers.hl();
                true
            }
            Instruction::Jr(cond, offset) => {
                let met = cond.is_met(self.registers.zf(), self.registers.cf());
                if met {
                    self.registers.pc = self.registers.pc.wrapping_add(offset as i16 as u16);
                }
                met
            }
            Instruction::Call(cond, target) => {
                let met = cond.is_met(self.registers.zf(), self.registers.cf());
                if met {
                    let pc = self.registers.pc;
                    self.push16(bus, pc);
                    self.registers.pc = target;
                }
                met
            }
            Instruction::Ret(cond) => {
                let met = cond.is_met(self.registers.zf(), self.registers.cf());
                if met {
                    self.registers.pc = self.pop16(bus);
                }
                met
            }
            Instruction::RetI => {
                self.registers.pc = self.pop16(bus);
                self.ime = true;
                self.ime_pending_set = false;
                true
            }
            Instruction::Rst(vector) => {
                let pc = self.registers.pc;
                self.push16(bus, pc);
                self.registers.pc = vector as u16;
                true
            }

            Instruction::IllegalOpcode(_) => unreachable!("intercepted in step() before execute() is reached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_dec_round_trip_every_value() {
        for start in 0..=255u8 {
            let mut regs = Registers::new();
            let inc = alu::inc8(&mut regs, start);
            let dec = alu::dec8(&mut regs, inc);
            assert_eq!(dec, start);
        }
    }

    #[test]
    fn skip_boot_rom_matches_documented_post_boot_state() {
        let mut cpu = Cpu::new();
        cpu.skip_boot_rom();
        assert_eq!(cpu.registers.af(), 0x01B0);
        assert_eq!(cpu.registers.bc(), 0x0013);
        assert_eq!(cpu.registers.de(), 0x00D8);
        assert_eq!(cpu.registers.hl(), 0x014D);
        assert_eq!(cpu.registers.sp, 0xFFFE);
        assert_eq!(cpu.registers.pc, 0x0100);
    }
}
