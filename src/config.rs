use std::path::PathBuf;
use std::time::Duration;

use crate::logger::LogLevel;
use crate::mmu::{AccessPolicy, Mapping};

/// Everything a `Machine` needs from its caller, as plain values.
#[derive(Debug, Clone)]
pub struct Config {
    pub rom_path: PathBuf,
    pub log_level: LogLevel,
    /// Wall-clock budget for `Machine::run_for`.
    pub runtime_limit: Duration,
    pub access_policy: AccessPolicy,
    /// `None` selects `mmu::default_mappings()`.
    pub mappings: Option<Vec<Mapping>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rom_path: PathBuf::from("hello.rom"),
            log_level: LogLevel::Info,
            runtime_limit: Duration::from_secs(10_000),
            access_policy: AccessPolicy::Tolerant,
            mappings: None,
        }
    }
}
