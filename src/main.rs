//! Command-line front end.
//!
//! Usage: emu6502 [--rom hello.rom] [--loglevel info] [--runtime 10000] [--strict]

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use emu6502::{
    config::Config,
    logger::{LogLevel, Logger},
    machine::Machine,
    mmu::AccessPolicy,
};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "emu6502", about = "Runs a raw 6502 ROM image until BRK or the time limit.")]
struct Args {
    /// ROM image, copied to the start of ROM.
    #[arg(long, value_name = "PATH", default_value = "hello.rom")]
    rom: PathBuf,

    /// Diagnostics printed to stderr at this level and above.
    #[arg(long, value_enum, default_value_t = Level::Info)]
    loglevel: Level,

    /// Wall-clock limit in seconds.
    #[arg(long, default_value_t = 10_000)]
    runtime: u64,

    /// Stop on unmapped accesses and ROM writes instead of logging them.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = Config {
        rom_path: args.rom,
        log_level: args.loglevel.into(),
        runtime_limit: Duration::from_secs(args.runtime),
        access_policy: if args.strict {
            AccessPolicy::Strict
        } else {
            AccessPolicy::Tolerant
        },
        mappings: None,
    };
    let logger = Logger::new(config.log_level);

    let mut machine = Machine::new(&config, logger, Box::new(io::stdout()))?;
    machine.reset()?;
    if let Some(interrupt) = machine.run_to_limit()? {
        logger.debug(format_args!("stopped by {:?}", interrupt));
    }
    if let Some(regs) = machine.registers() {
        logger.info(format_args!(
            "A:{:02X} X:{:02X} Y:{:02X} SP:{:02X} PC:{:04X} P:{:02X}",
            regs.a,
            regs.x,
            regs.y,
            regs.sp,
            regs.pc,
            regs.flags.to_byte()
        ));
    }
    Ok(())
}
