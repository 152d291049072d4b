//! Whole-stack scenarios exercising the CPU, bus, cartridge, timer, PPU and
//! APU together, the way a single instruction stream or register poke would
//! on real hardware. Unit tests beside each module cover narrower properties;
//! these confirm the pieces add up correctly when wired through `Bus`.

use boyemu_core::hardware::bus::{Bus, BusConfig};
use boyemu_core::hardware::cartridge::Cartridge;
use boyemu_core::hardware::cpu::Cpu;
use boyemu_core::io::interrupts::InterruptFlags;
use boyemu_core::UnsupportedMbcPolicy;
use pretty_assertions::assert_eq;

fn blank_bus(rom: Vec<u8>) -> Bus {
    Bus::new(BusConfig {
        rom,
        saved_ram: None,
        mbc_policy: UnsupportedMbcPolicy::DegradeToNoMbc,
        boot_rom: None,
        is_cgb: false,
        now_unix_seconds: 0,
    })
    .unwrap()
}

/// `NOP; LD A,4; LD (0xFFFF),A; LD B,0x2A; EI; NOP; HALT; DI; JR -2` at 0x100.
/// IE ends up TIMER-only, set by the program itself rather than poked in from
/// the test, since nothing outside cartridge ROM is reachable before boot.
#[test]
fn halt_with_no_pending_interrupt_parks_the_cpu() {
    let mut rom = vec![0u8; 0x8000];
    let program: &[u8] = &[
        0x00, // NOP
        0x3E, 0x04, // LD A,0x04
        0xEA, 0xFF, 0xFF, // LD (0xFFFF),A  -- IE = TIMER
        0x06, 0x2A, // LD B,0x2A
        0xFB, // EI
        0x00, // NOP (EI's one-instruction delay)
        0x76, // HALT
        0xF3, // DI (never reached: CPU stays halted)
        0x18, 0xFE, // JR -2
    ];
    rom[0x100..0x100 + program.len()].copy_from_slice(program);

    let mut bus = blank_bus(rom);
    let mut cpu = Cpu::new();
    cpu.skip_boot_rom();

    let mut total_clocks = 0u32;
    for _ in 0..100 {
        let clocks = cpu.step(&mut bus).unwrap();
        bus.tick(clocks);
        total_clocks += clocks;
    }

    assert!(cpu.halted, "CPU should still be halted after 100 steps with IF empty");
    assert_eq!(cpu.registers.b, 0x2A);
    assert_eq!(bus.read(0xFF0F) & InterruptFlags::TIMER.bits(), 0, "no interrupt was ever pending to service");
    // NOP(4) + LD A,d8(8) + LD (nn),A(16) + LD B,d8(8) + EI(4) + NOP(4) + HALT(4) = 48,
    // then 93 more steps idling at 4 clocks each while halted.
    assert_eq!(total_clocks, 48 + 93 * 4);
}

#[test]
fn timer_increments_on_schedule_and_then_overflows_into_tma() {
    let mut bus = blank_bus(vec![0u8; 0x8000]);
    bus.write(0xFF06, 0x80); // TMA
    bus.write(0xFF07, 0x05); // TAC: enabled, CPU/16
    bus.write(0xFF05, 0x00); // TIMA

    bus.tick(16);
    assert_eq!(bus.read(0xFF05), 1);
    bus.tick(16);
    assert_eq!(bus.read(0xFF05), 2);

    bus.write(0xFF05, 0xFF);
    bus.tick(16); // falling edge: 0xFF -> 0x00, overflow latched for next M-cycle
    assert_eq!(bus.read(0xFF05), 0x00);
    assert_eq!(bus.read(0xFF0F) & InterruptFlags::TIMER.bits(), 0);

    bus.tick(4); // the delayed reload + interrupt request
    assert_eq!(bus.read(0xFF05), 0x80);
    assert_eq!(bus.read(0xFF0F) & InterruptFlags::TIMER.bits(), InterruptFlags::TIMER.bits());
}

#[test]
fn mbc1_bank_0_alias_and_mode_1_high_bits() {
    let mut rom = vec![0u8; 32 * 0x4000]; // 512 KiB, 32 banks
    rom[0x0147] = 0x01; // MBC1, no RAM, no battery
    rom[0x0148] = 0x04; // 32 banks
    for bank in 0..32u8 {
        rom[bank as usize * 0x4000] = bank;
    }

    let mut cart = Cartridge::new(&rom, None, UnsupportedMbcPolicy::Refuse, 0).unwrap();

    cart.write(0x2000, 0x05);
    assert_eq!(cart.read(0x4000), 5, "selecting bank 5 should surface its first byte");

    cart.write(0x6000, 0x01); // mode 1
    cart.write(0x4000, 0x00); // upper bits = 0
    cart.write(0x2000, 0x00); // low bits = 0, aliases to bank 1
    assert_eq!(cart.read(0x4000), 1, "writing 0 to the low bank selector aliases to bank 1");
}

#[test]
fn oam_dma_blocks_reads_during_transfer_then_completes() {
    let mut bus = blank_bus(vec![0u8; 0x8000]);
    for i in 0..0xA0u16 {
        bus.write(0xC000 + i, i as u8);
    }

    bus.write(0xFF46, 0xC0); // source = 0xC000

    // Copy already happened eagerly, but reads outside HRAM are blocked while
    // the transfer's clock countdown is still running.
    assert_eq!(bus.read(0x8000), 0xFF);

    bus.tick(640);

    assert_eq!(bus.read(0x8000), 0x00, "VRAM reads are unblocked once the DMA window closes");
    for i in 0..0xA0u16 {
        assert_eq!(bus.read(0xFE00 + i), i as u8);
    }
}

#[test]
fn stat_interrupt_fires_once_per_ly_lyc_match() {
    let mut bus = blank_bus(vec![0u8; 0x8000]);
    bus.write(0xFF40, 0x80); // LCD on, everything else off
    bus.write(0xFF41, 0x40); // enable the LYC=LY STAT source
    bus.write(0xFF45, 0x90); // LYC = 144

    while bus.ppu.ly != 0x90 {
        bus.tick(1);
    }
    assert_eq!(bus.read(0xFF0F) & InterruptFlags::LCD.bits(), InterruptFlags::LCD.bits());
    bus.write(0xFF0F, 0);

    while bus.ppu.ly == 0x90 {
        bus.tick(1);
        assert_eq!(bus.read(0xFF0F) & InterruptFlags::LCD.bits(), 0, "STAT should not re-fire while LY stays at LYC");
    }
}

#[test]
fn apu_channel_2_length_counter_disables_the_channel() {
    let mut bus = blank_bus(vec![0u8; 0x8000]);
    bus.write(0xFF16, 0x00); // NR21: duty 0, length data 0 -> full 64-tick counter
    bus.write(0xFF17, 0xF0); // NR22: volume 15, envelope off (DAC on)
    bus.write(0xFF19, 0xC0); // NR24: trigger, length enable, freq high bits 0

    assert_eq!(bus.read(0xFF26) & 0x02, 0x02, "channel 2 should be active right after trigger");

    // 64 length ticks happen on frame-sequencer steps 0/2/4/6, i.e. every
    // other of the 8192-clock steps: 128 steps' worth of clocks.
    bus.tick(128 * 8192);

    assert_eq!(bus.read(0xFF26) & 0x02, 0x00, "length counter reaching zero should disable channel 2");
}
