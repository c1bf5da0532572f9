use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use emu6502::config::Config;
use emu6502::cpu::cpu::Interrupt;
use emu6502::error::{EmuError, FaultKind};
use emu6502::logger::{LogLevel, Logger};
use emu6502::machine::Machine;
use emu6502::mmu::{AccessPolicy, BackingStore, Mapping};
use emu6502::peripheral::gpu::SharedOutput;

/// ROM starts at $4020 in the default map.
const ROM_BASE: u16 = 0x4020;
const ROM_SIZE: usize = 0xBFE0;
const TIMEOUT: Duration = Duration::from_secs(5);

/// Writes a ROM image with `program` at $4020 and the reset vector pointing at it.
fn rom_image(name: &str, program: &[u8]) -> PathBuf {
    let mut image = vec![0u8; ROM_SIZE];
    image[..program.len()].copy_from_slice(program);
    let vector = (0xFFFC - ROM_BASE) as usize;
    image[vector] = ROM_BASE as u8;
    image[vector + 1] = (ROM_BASE >> 8) as u8;

    let file = format!("emu6502-e2e-{}-{}.rom", name, std::process::id());
    let path = std::env::temp_dir().join(file);
    fs::write(&path, image).unwrap();
    path
}

fn config(rom_path: PathBuf) -> Config {
    Config {
        rom_path,
        log_level: LogLevel::Error,
        ..Config::default()
    }
}

fn machine(config: &Config) -> (Machine, SharedOutput) {
    let output = SharedOutput::default();
    let logger = Logger::new(config.log_level);
    let machine = Machine::new(config, logger, Box::new(output.clone())).unwrap();
    (machine, output)
}

#[test]
fn prints_a_character_and_stops_on_brk() {
    // LDA #'A'; STA $4000; BRK
    let path = rom_image("hello", &[0xA9, 0x41, 0x8D, 0x00, 0x40, 0x00]);
    let (mut machine, output) = machine(&config(path.clone()));

    machine.reset().unwrap();
    let regs = machine.registers().unwrap();
    assert_eq!(regs.pc, ROM_BASE);
    assert!(regs.flags.int_disable);

    let interrupt = machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(interrupt, Some(Interrupt::Break { pc: 0x4025 }));
    assert_eq!(output.contents(), b"A");
    let regs = machine.registers().unwrap();
    assert_eq!(regs.a, 0x41);
    assert_eq!(regs.pc, 0x4026);
    assert!(regs.flags.brk);
}

#[test]
fn repeated_reset_restarts_the_cpu_only() {
    let program = [
        0xA9, 0x07, //       LDA #$07
        0x85, 0x10, //       STA $10
        0xA9, 0x21, //       LDA #'!'
        0x8D, 0x00, 0x20, // STA $2000
        0x00, //             BRK
    ];
    let path = rom_image("rereset", &program);
    let (mut machine, _) = machine(&config(path.clone()));

    machine.reset().unwrap();
    machine.reset().unwrap();
    let regs = machine.registers().unwrap();
    assert_eq!(regs.pc, ROM_BASE);
    assert_eq!(regs.sp, 0xFD);

    let interrupt = machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();
    assert_eq!(interrupt, Some(Interrupt::Break { pc: 0x4029 }));
    assert_eq!(machine.registers().unwrap().a, 0x21);
}

#[test]
fn prints_a_string_from_rom() {
    let mut program = vec![
        0xA2, 0x00, //       LDX #$00
        0xBD, 0x40, 0x40, // loop: LDA $4040,X
        0xF0, 0x06, //       BEQ done
        0x8D, 0x00, 0x40, // STA $4000
        0xE8, //             INX
        0xD0, 0xF5, //       BNE loop
        0x00, //             done: BRK
    ];
    program.resize(0x20, 0xEA);
    program.extend_from_slice(b"Hi!\0");
    let path = rom_image("string", &program);
    let (mut machine, output) = machine(&config(path.clone()));

    let interrupt = machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(interrupt, Some(Interrupt::Break { pc: 0x402D }));
    assert_eq!(output.contents(), b"Hi!");
    assert_eq!(machine.registers().unwrap().x, 3);
}

#[test]
fn subroutines_use_the_privram_stack() {
    let mut program = vec![
        0x20, 0x30, 0x40, // JSR $4030
        0x20, 0x30, 0x40, // JSR $4030
        0x00, //             BRK
    ];
    program.resize(0x10, 0xEA);
    program.extend_from_slice(&[
        0xA9, 0x2A, //       $4030: LDA #'*'
        0x8D, 0x00, 0x40, // STA $4000
        0x60, //             RTS
    ]);
    let path = rom_image("jsr", &program);
    let (mut machine, output) = machine(&config(path.clone()));

    machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(output.contents(), b"**");
    assert_eq!(machine.registers().unwrap().sp, 0xFD);
}

#[test]
fn ram_round_trips_over_the_bus() {
    let program = [
        0xA9, 0x5A, //       LDA #'Z'
        0x8D, 0x00, 0x20, // STA $2000
        0xA9, 0x00, //       LDA #$00
        0xAD, 0x00, 0x20, // LDA $2000
        0x8D, 0x00, 0x40, // STA $4000
        0x00, //             BRK
    ];
    let path = rom_image("ram", &program);
    let (mut machine, output) = machine(&config(path.clone()));

    machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(output.contents(), b"Z");
}

#[test]
fn mapping_table_is_visible_to_the_guest() {
    // High byte of the GPU record's virtual start: record 3, byte 1.
    let program = [
        0xAD, 0xFC, 0x3F, // LDA $3FFC
        0x8D, 0x00, 0x40, // STA $4000
        0x00, //             BRK
    ];
    let path = rom_image("window", &program);
    let (mut machine, output) = machine(&config(path.clone()));

    machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(output.contents(), b"@");
}

#[test]
fn rom_write_is_dropped_when_tolerant() {
    let program = [
        0xA9, 0x42, //       LDA #$42
        0x8D, 0x30, 0x40, // STA $4030
        0xAD, 0x30, 0x40, // LDA $4030
        0x00, //             BRK
    ];
    let path = rom_image("tolerant", &program);
    let (mut machine, _) = machine(&config(path.clone()));

    let interrupt = machine.run_for(TIMEOUT).unwrap();
    fs::remove_file(path).unwrap();

    assert!(matches!(interrupt, Some(Interrupt::Break { .. })));
    assert_eq!(machine.registers().unwrap().a, 0x00);
}

#[test]
fn rom_write_stops_the_machine_when_strict() {
    let program = [
        0xA9, 0x42, //       LDA #$42
        0x8D, 0x30, 0x40, // STA $4030
        0x00, //             BRK
    ];
    let path = rom_image("strict", &program);
    let mut config = config(path.clone());
    config.access_policy = AccessPolicy::Strict;
    let (mut machine, _) = machine(&config);

    let result = machine.run_for(TIMEOUT);
    fs::remove_file(path).unwrap();

    match result {
        Err(EmuError::MemoryFault { address, kind }) => {
            assert_eq!(address, 0x4030);
            assert_eq!(kind, FaultKind::RomWrite);
        }
        other => panic!("expected a memory fault, got {:?}", other),
    }
    assert!(!machine.registers().unwrap().flags.brk);
}

#[test]
fn illegal_opcode_ends_the_run() {
    let path = rom_image("illegal", &[0xEA, 0x02]);
    let (mut machine, _) = machine(&config(path.clone()));

    let result = machine.run_for(TIMEOUT);
    fs::remove_file(path).unwrap();

    assert!(matches!(
        result,
        Err(EmuError::IllegalOpcode { opcode: 0x02, pc: 0x4021 })
    ));
}

#[test]
fn runtime_limit_halts_a_spinning_program() {
    // JMP $4020
    let path = rom_image("spin", &[0x4C, 0x20, 0x40]);
    let (mut machine, output) = machine(&config(path.clone()));

    let interrupt = machine.run_for(Duration::from_millis(50)).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(interrupt, None);
    assert!(!machine.is_cpu_running());
    assert_eq!(machine.registers().unwrap().pc, ROM_BASE);
    assert!(output.contents().is_empty());
}

#[test]
fn missing_rom_fails_reset() {
    let path = std::env::temp_dir().join("emu6502-e2e-missing.rom");
    let (mut machine, _) = machine(&config(path));

    assert!(matches!(machine.reset(), Err(EmuError::Io { .. })));
    machine.halt().unwrap();
}

#[test]
fn malformed_mapping_tables_are_rejected() {
    let logger = Logger::new(LogLevel::Error);
    let build = |mappings: Vec<Mapping>| {
        let config = Config {
            mappings: Some(mappings),
            log_level: LogLevel::Error,
            ..Config::default()
        };
        Machine::new(&config, logger, Box::new(SharedOutput::default())).err()
    };

    assert!(matches!(build(vec![]), Some(EmuError::EmptyMappingTable)));
    assert!(matches!(
        build(vec![Mapping::new(0x0000, 0, 0x100, BackingStore::Ram)]),
        Some(EmuError::PrivRamNotFirst(_))
    ));
    assert!(matches!(
        build(vec![
            Mapping::new(0x0000, 0, 0x100, BackingStore::PrivRam),
            Mapping::new(0x1000, 0, 0x100, BackingStore::PrivRam),
        ]),
        Some(EmuError::DuplicatePrivRam { index: 1 })
    ));
    assert!(matches!(
        build(vec![
            Mapping::new(0x0000, 0, 0x100, BackingStore::PrivRam),
            Mapping::new(0x1000, 0, 0x100, BackingStore::Ram),
            Mapping::new(0x10FF, 0, 0x100, BackingStore::Rom),
        ]),
        Some(EmuError::OverlappingMappings { .. })
    ));
}
