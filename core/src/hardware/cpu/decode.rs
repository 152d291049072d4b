//! Opcode decoding via the standard bit-field decomposition
//! (`x = op>>6`, `y = (op>>3)&7`, `z = op&7`, `p = y>>1`, `q = y&1`) rather
//! than a 256-arm match on the raw byte. The CB-prefixed page decomposes the
//! same way and needs no additional operand bytes.

use crate::hardware::cpu::instruction::{AluOp, Direction, Instruction, RotateOp};
use crate::hardware::cpu::operand::{Condition, Indirect, MemAddress, Operand8};
use crate::hardware::registers::Reg16;

fn reg8_of(index: u8) -> Operand8 {
    use crate::hardware::registers::Reg8::*;
    match index {
        0 => Operand8::Reg(B),
        1 => Operand8::Reg(C),
        2 => Operand8::Reg(D),
        3 => Operand8::Reg(E),
        4 => Operand8::Reg(H),
        5 => Operand8::Reg(L),
        6 => Operand8::HlIndirect,
        7 => Operand8::Reg(A),
        _ => unreachable!("3-bit field"),
    }
}

fn reg16_sp_of(index: u8) -> Reg16 {
    match index {
        0 => Reg16::BC,
        1 => Reg16::DE,
        2 => Reg16::HL,
        3 => Reg16::SP,
        _ => unreachable!("2-bit field"),
    }
}

fn reg16_af_of(index: u8) -> Reg16 {
    match index {
        0 => Reg16::BC,
        1 => Reg16::DE,
        2 => Reg16::HL,
        3 => Reg16::AF,
        _ => unreachable!("2-bit field"),
    }
}

fn cond_of(index: u8) -> Condition {
    match index {
        0 => Condition::NotZero,
        1 => Condition::Zero,
        2 => Condition::NotCarry,
        3 => Condition::Carry,
        _ => unreachable!("2-bit field"),
    }
}

fn alu_op_of(index: u8) -> AluOp {
    match index {
        0 => AluOp::Add,
        1 => AluOp::Adc,
        2 => AluOp::Sub,
        3 => AluOp::Sbc,
        4 => AluOp::And,
        5 => AluOp::Xor,
        6 => AluOp::Or,
        7 => AluOp::Cp,
        _ => unreachable!("3-bit field"),
    }
}

fn rot_op_of(index: u8) -> RotateOp {
    match index {
        0 => RotateOp::Rlc,
        1 => RotateOp::Rrc,
        2 => RotateOp::Rl,
        3 => RotateOp::Rr,
        4 => RotateOp::Sla,
        5 => RotateOp::Sra,
        6 => RotateOp::Swap,
        7 => RotateOp::Srl,
        _ => unreachable!("3-bit field"),
    }
}

/// `rXX[y]` operand register cost, in clocks: `(HL)` is always 4 clocks more
/// expensive than a plain register, for the read-modify-write it implies.
fn indirect_penalty(operand: Operand8) -> u8 {
    if operand == Operand8::HlIndirect {
        4
    } else {
        0
    }
}

pub struct Fetcher<'a> {
    pub fetch8: &'a mut dyn FnMut() -> u8,
}

impl<'a> Fetcher<'a> {
    fn u8(&mut self) -> u8 {
        (self.fetch8)()
    }

    fn i8(&mut self) -> i8 {
        self.u8() as i8
    }

    fn u16(&mut self) -> u16 {
        let lo = self.u8();
        let hi = self.u8();
        (hi as u16) << 8 | lo as u16
    }
}

/// Decodes one unprefixed opcode, consuming any further operand bytes from
/// `fetcher`. Returns the instruction plus its nominal duration and, for
/// conditional jumps/calls/returns, the shorter duration taken when the
/// branch is not taken (identical to the nominal duration otherwise).
pub fn decode(opcode: u8, fetcher: &mut Fetcher) -> (Instruction, u8, u8) {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1;

    match x {
        0 => decode_x0(y, z, p, q, fetcher),
        1 => {
            if y == 6 && z == 6 {
                (Instruction::Halt, 4, 4)
            } else {
                let dst = reg8_of(y);
                let src = reg8_of(z);
                let clocks = 4 + indirect_penalty(dst) + indirect_penalty(src);
                (Instruction::Load8 { dst, src }, clocks, clocks)
            }
        }
        2 => {
            let operand = reg8_of(z);
            let clocks = 4 + indirect_penalty(operand);
            (
                Instruction::Alu8 { op: alu_op_of(y), operand },
                clocks,
                clocks,
            )
        }
        3 => decode_x3(y, z, p, q, fetcher),
        _ => unreachable!("2-bit field"),
    }
}

fn decode_x0(y: u8, z: u8, p: u8, q: u8, fetcher: &mut Fetcher) -> (Instruction, u8, u8) {
    match z {
        0 => match y {
            0 => (Instruction::Nop, 4, 4),
            1 => (Instruction::LoadAbsoluteSp(fetcher.u16()), 20, 20),
            2 => (Instruction::Stop(fetcher.u8()), 4, 4),
            3 => (Instruction::Jr(Condition::Always, fetcher.i8()), 12, 12),
            4..=7 => (Instruction::Jr(cond_of(y - 4), fetcher.i8()), 12, 8),
            _ => unreachable!("3-bit field"),
        },
        1 => {
            let reg = reg16_sp_of(p);
            if q == 0 {
                (Instruction::Load16 { dst: reg, value: fetcher.u16() }, 12, 12)
            } else {
                (Instruction::AddHl(reg), 8, 8)
            }
        }
        2 => {
            let direction = if q == 0 { Direction::FromA } else { Direction::IntoA };
            let indirect = match p {
                0 => Indirect::Bc,
                1 => Indirect::De,
                2 => Indirect::HlIncrement,
                3 => Indirect::HlDecrement,
                _ => unreachable!("2-bit field"),
            };
            (Instruction::LoadIndirect { indirect, direction }, 8, 8)
        }
        3 => {
            let reg = reg16_sp_of(p);
            if q == 0 {
                (Instruction::Inc16(reg), 8, 8)
            } else {
                (Instruction::Dec16(reg), 8, 8)
            }
        }
        4 => {
            let operand = reg8_of(y);
            let clocks = 4 + indirect_penalty(operand);
            (Instruction::Inc8(operand), clocks, clocks)
        }
        5 => {
            let operand = reg8_of(y);
            let clocks = 4 + indirect_penalty(operand);
            (Instruction::Dec8(operand), clocks, clocks)
        }
        6 => {
            let dst = reg8_of(y);
            let clocks = 8 + indirect_penalty(dst);
            (Instruction::Load8 { dst, src: Operand8::Immediate(fetcher.u8()) }, clocks, clocks)
        }
        7 => {
            let instr = match y {
                0 => Instruction::RotateA(RotateOp::Rlc),
                1 => Instruction::RotateA(RotateOp::Rrc),
                2 => Instruction::RotateA(RotateOp::Rl),
                3 => Instruction::RotateA(RotateOp::Rr),
                4 => Instruction::Daa,
                5 => Instruction::Cpl,
                6 => Instruction::Scf,
                7 => Instruction::Ccf,
                _ => unreachable!("3-bit field"),
            };
            (instr, 4, 4)
        }
        _ => unreachable!("3-bit field"),
    }
}

fn decode_x3(y: u8, z: u8, p: u8, q: u8, fetcher: &mut Fetcher) -> (Instruction, u8, u8) {
    match z {
        0 => match y {
            0..=3 => (Instruction::Ret(cond_of(y)), 20, 8),
            4 => (Instruction::LoadHigh { addr: MemAddress::HighImmediate(fetcher.u8()), direction: Direction::FromA }, 12, 12),
            5 => (Instruction::AddSp(fetcher.i8()), 16, 16),
            6 => (Instruction::LoadHigh { addr: MemAddress::HighImmediate(fetcher.u8()), direction: Direction::IntoA }, 12, 12),
            7 => (Instruction::LoadSpToHl(fetcher.i8()), 12, 12),
            _ => unreachable!("3-bit field"),
        },
        1 => {
            if q == 0 {
                (Instruction::Pop(reg16_af_of(p)), 12, 12)
            } else {
                match p {
                    0 => (Instruction::Ret(Condition::Always), 16, 16),
                    1 => (Instruction::RetI, 16, 16),
                    2 => (Instruction::JpHl, 4, 4),
                    3 => (Instruction::LoadHlToSp, 8, 8),
                    _ => unreachable!("2-bit field"),
                }
            }
        }
        2 => match y {
            0..=3 => (Instruction::Jp(cond_of(y), fetcher.u16()), 16, 12),
            4 => (Instruction::LoadHigh { addr: MemAddress::HighC, direction: Direction::FromA }, 8, 8),
            5 => decode_absolute_load(y, fetcher),
            6 => (Instruction::LoadHigh { addr: MemAddress::HighC, direction: Direction::IntoA }, 8, 8),
            7 => decode_absolute_load(y, fetcher),
            _ => unreachable!("3-bit field"),
        },
        3 => match y {
            0 => (Instruction::Jp(Condition::Always, fetcher.u16()), 16, 16),
            1 => unreachable!("0xCB is intercepted by the caller before decode() is reached"),
            6 => (Instruction::DisableInterrupts, 4, 4),
            7 => (Instruction::EnableInterrupts, 4, 4),
            _ => (Instruction::IllegalOpcode(reconstruct(0b11, y, z)), 4, 4),
        },
        4 => match y {
            0..=3 => (Instruction::Call(cond_of(y), fetcher.u16()), 24, 12),
            _ => (Instruction::IllegalOpcode(reconstruct(0b11, y, z)), 4, 4),
        },
        5 => {
            if q == 0 {
                (Instruction::Push(reg16_af_of(p)), 16, 16)
            } else if p == 0 {
                (Instruction::Call(Condition::Always, fetcher.u16()), 24, 24)
            } else {
                (Instruction::IllegalOpcode(reconstruct(0b11, y, z)), 4, 4)
            }
        }
        6 => (
            Instruction::Alu8 { op: alu_op_of(y), operand: Operand8::Immediate(fetcher.u8()) },
            8,
            8,
        ),
        7 => (Instruction::Rst(y * 8), 16, 16),
        _ => unreachable!("3-bit field"),
    }
}

fn reconstruct(x: u8, y: u8, z: u8) -> u8 {
    (x << 6) | (y << 3) | z
}

/// `LD (a16),A` / `LD A,(a16)` and `LD (C),A` / `LD A,(C)` are absolute-address
/// loads, not `r,r` moves; `decode_x3`'s z=2 arm special-cases them here since
/// they need the extra operand byte(s) the generic table doesn't carry.
pub fn decode_absolute_load(y: u8, fetcher: &mut Fetcher) -> (Instruction, u8, u8) {
    match y {
        5 => (
            Instruction::LoadHigh { addr: MemAddress::Absolute(fetcher.u16()), direction: Direction::FromA },
            16,
            16,
        ),
        7 => (
            Instruction::LoadHigh { addr: MemAddress::Absolute(fetcher.u16()), direction: Direction::IntoA },
            16,
            16,
        ),
        _ => unreachable!("only called for y=5 and y=7"),
    }
}

/// Decodes a CB-prefixed opcode. Every form is 8 clocks, except when the
/// operand is `(HL)`: `BIT` only reads it (12 clocks), while `RES`/`SET` and
/// the rotate group read-modify-write it (16 clocks).
pub fn decode_prefixed(opcode: u8) -> (Instruction, u8) {
    let x = opcode >> 6;
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let operand = reg8_of(z);
    let is_hl = operand == Operand8::HlIndirect;

    match x {
        0 => (Instruction::Rotate { op: rot_op_of(y), operand }, if is_hl { 16 } else { 8 }),
        1 => (Instruction::Bit { bit: y, operand }, if is_hl { 12 } else { 8 }),
        2 => (Instruction::Res { bit: y, operand }, if is_hl { 16 } else { 8 }),
        3 => (Instruction::Set { bit: y, operand }, if is_hl { 16 } else { 8 }),
        _ => unreachable!("2-bit field"),
    }
}
