//! Error type shared by every unit of the emulator.
//!
//! Only conditions that stop the machine are errors. Guest-program mistakes
//! such as unmapped reads or writes to ROM are logged by the MMU and the
//! machine keeps running (unless the strict access policy is selected).

use std::path::PathBuf;

use thiserror::Error;

use crate::cpu::addressing::AddressMode;
use crate::cpu::dispatch::Instruction;
use crate::mmu::{BackingStore, Mapping};

pub type Result<T> = std::result::Result<T, EmuError>;

/// The kind of access that tripped a strict-mode memory fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    UnmappedRead,
    UnmappedWrite,
    RomWrite,
}

#[derive(Debug, Error)]
pub enum EmuError {
    #[error("cannot read ROM image {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping table is empty")]
    EmptyMappingTable,

    #[error("PrivRAM must be the first mapping, found {0}")]
    PrivRamNotFirst(Mapping),

    #[error("PrivRAM must only be mapped once, mapping #{index} is PrivRAM too")]
    DuplicatePrivRam { index: usize },

    #[error("physical range of {0} does not fit in 32 bits")]
    PhysicalRangeOverflow(Mapping),

    #[error("overlapping mappings:\n  {first}\n  {second}")]
    OverlappingMappings { first: Mapping, second: Mapping },

    #[error("no bus connection for backing store {0:?}")]
    MissingConnection(BackingStore),

    #[error("dispatch table inconsistency: {instruction:?} does not support {mode:?}")]
    InvalidAddressMode {
        instruction: Instruction,
        mode: AddressMode,
    },

    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    #[error("memory fault ({kind:?}) at ${address:04X}")]
    MemoryFault { address: u16, kind: FaultKind },

    #[error("bus to {0} disconnected")]
    BusDisconnected(&'static str),

    #[error("cannot start {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
