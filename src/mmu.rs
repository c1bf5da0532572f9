//! Memory management unit: splits the 16-bit virtual address space into
//! windows backed by PrivRAM, bus peripherals, or the mapping table itself.
//!
//! The mapping table is fixed at construction and scanned in order on every
//! access. PrivRAM is served in place; RAM, ROM and GPU accesses become one
//! bus transaction each.

use std::fmt;

use crate::bus::{Bus, BusConnection};
use crate::error::{EmuError, FaultKind, Result};
use crate::logger::Logger;
use crate::privram::PrivRam;

/// Bytes per mapping record in the mapping-table window: virt start (2),
/// phys start (4), size (2), backing store id (1).
pub const MAPPING_RECORD_LEN: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingStore {
    PrivRam,
    Ram,
    Rom,
    Gpu,
    /// Read-only view of the mapping table.
    Mmu,
}

impl BackingStore {
    /// Id exposed through the mapping-table window.
    pub fn id(self) -> u8 {
        match self {
            BackingStore::Ram => 0,
            BackingStore::Rom => 1,
            BackingStore::Gpu => 2,
            BackingStore::Mmu => 3,
            BackingStore::PrivRam => 4,
        }
    }
}

/// How the MMU treats guest accesses that real hardware would just ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicy {
    /// Log and carry on: unmapped reads give 0, bad writes are dropped.
    #[default]
    Tolerant,
    /// Same as tolerant, but the first such access also stops the CPU.
    Strict,
}

/// One window of the virtual address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub virt_start: u16,
    pub phys_start: u32,
    pub size: u16,
    pub backing_store: BackingStore,
}

impl Mapping {
    pub const fn new(
        virt_start: u16,
        phys_start: u32,
        size: u16,
        backing_store: BackingStore,
    ) -> Self {
        Self {
            virt_start,
            phys_start,
            size,
            backing_store,
        }
    }

    /// Exclusive end; may be 0x10000 for the last page.
    pub fn virt_end(&self) -> u32 {
        self.virt_start as u32 + self.size as u32
    }

    pub fn contains(&self, addr: u16) -> bool {
        addr >= self.virt_start && (addr as u32) < self.virt_end()
    }

    pub fn overlaps(&self, other: &Mapping) -> bool {
        (self.virt_start as u32) < other.virt_end() && (other.virt_start as u32) < self.virt_end()
    }

    fn record_byte(&self, offset: u32) -> u8 {
        match offset {
            0 => self.virt_start as u8,
            1 => (self.virt_start >> 8) as u8,
            2 => self.phys_start as u8,
            3 => (self.phys_start >> 8) as u8,
            4 => (self.phys_start >> 16) as u8,
            5 => (self.phys_start >> 24) as u8,
            6 => self.size as u8,
            7 => (self.size >> 8) as u8,
            _ => self.backing_store.id(),
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:04X}-${:04X} -> {:?} @ ${:04X}",
            self.virt_start,
            self.virt_end() - 1,
            self.backing_store,
            self.phys_start
        )
    }
}

/// Default address map.
///
/// | Virtual         | Store          |
/// |-----------------|----------------|
/// | `$0000-$1FFF`   | PrivRAM        |
/// | `$2000-$3FDF`   | RAM            |
/// | `$3FE0-$3FFF`   | mapping table  |
/// | `$4000-$401F`   | GPU            |
/// | `$4020-$FFFF`   | ROM            |
pub fn default_mappings() -> Vec<Mapping> {
    vec![
        Mapping::new(0x0000, 0x0000, 0x2000, BackingStore::PrivRam),
        Mapping::new(0x2000, 0x0000, 0x1FE0, BackingStore::Ram),
        Mapping::new(0x3FE0, 0x0000, 0x0020, BackingStore::Mmu),
        Mapping::new(0x4000, 0x0000, 0x0020, BackingStore::Gpu),
        Mapping::new(0x4020, 0x0000, 0xBFE0, BackingStore::Rom),
    ]
}

/// Checks the table invariants: PrivRAM first and only first, every
/// physical range addressable, no two windows overlapping.
pub fn validate_mappings(mappings: &[Mapping]) -> Result<()> {
    let first = mappings.first().ok_or(EmuError::EmptyMappingTable)?;
    if first.backing_store != BackingStore::PrivRam {
        return Err(EmuError::PrivRamNotFirst(*first));
    }
    if let Some(index) = mappings
        .iter()
        .skip(1)
        .position(|m| m.backing_store == BackingStore::PrivRam)
    {
        return Err(EmuError::DuplicatePrivRam { index: index + 1 });
    }

    if let Some(m) = mappings
        .iter()
        .find(|m| m.phys_start.checked_add(m.size as u32).is_none())
    {
        return Err(EmuError::PhysicalRangeOverflow(*m));
    }

    for (i, a) in mappings.iter().enumerate() {
        for b in &mappings[i + 1..] {
            if a.overlaps(b) {
                return Err(EmuError::OverlappingMappings {
                    first: *a,
                    second: *b,
                });
            }
        }
    }
    Ok(())
}

/// Bus connections the MMU routes peripheral windows to.
#[derive(Default)]
pub struct Connections {
    pub ram: Option<BusConnection>,
    pub rom: Option<BusConnection>,
    pub gpu: Option<BusConnection>,
}

pub struct Mmu {
    mappings: Vec<Mapping>,
    privram: PrivRam,
    connections: Connections,
    policy: AccessPolicy,
    logger: Logger,
    fault: Option<EmuError>,
}

impl Mmu {
    /// Validates `mappings` and wires every peripheral window to its bus.
    pub fn new(
        mappings: Vec<Mapping>,
        connections: Connections,
        policy: AccessPolicy,
        logger: Logger,
    ) -> Result<Self> {
        validate_mappings(&mappings)?;

        for mapping in &mappings {
            let connected = match mapping.backing_store {
                BackingStore::Ram => connections.ram.is_some(),
                BackingStore::Rom => connections.rom.is_some(),
                BackingStore::Gpu => connections.gpu.is_some(),
                BackingStore::PrivRam | BackingStore::Mmu => true,
            };
            if !connected {
                return Err(EmuError::MissingConnection(mapping.backing_store));
            }
        }

        let privram_window = mappings[0];
        let privram =
            PrivRam::new(privram_window.phys_start as usize + privram_window.size as usize);
        for mapping in &mappings {
            logger.debug(format_args!("MMU mapping {}", mapping));
        }

        Ok(Self {
            mappings,
            privram,
            connections,
            policy,
            logger,
            fault: None,
        })
    }

    /// Zeroes PrivRAM. Peripheral storage is reset by the peripherals.
    pub fn clear_privram(&mut self) {
        self.logger.debug("PrivRAM cleared");
        self.privram.clear();
    }

    /// Physical address of `addr` inside the first window containing it.
    pub fn translate(&self, addr: u16) -> Option<u32> {
        self.find(addr)
            .map(|m| m.phys_start + (addr - m.virt_start) as u32)
    }

    fn find(&self, addr: u16) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.contains(addr))
    }

    fn connection(&self, store: BackingStore) -> Option<&BusConnection> {
        match store {
            BackingStore::Ram => self.connections.ram.as_ref(),
            BackingStore::Rom => self.connections.rom.as_ref(),
            BackingStore::Gpu => self.connections.gpu.as_ref(),
            BackingStore::PrivRam | BackingStore::Mmu => None,
        }
    }

    fn record(&mut self, error: EmuError) {
        if self.fault.is_none() {
            self.fault = Some(error);
        }
    }

    fn guest_fault(&mut self, address: u16, kind: FaultKind) {
        if self.policy == AccessPolicy::Strict {
            self.record(EmuError::MemoryFault { address, kind });
        }
    }

    fn mapping_table_byte(&self, phys: u32) -> u8 {
        let index = (phys / MAPPING_RECORD_LEN) as usize;
        match self.mappings.get(index) {
            Some(mapping) => mapping.record_byte(phys % MAPPING_RECORD_LEN),
            None => {
                self.logger
                    .warn(format_args!("MMU: mapping table read past last record: {}", phys));
                0
            }
        }
    }
}

impl Bus for Mmu {
    fn read(&mut self, addr: u16) -> u8 {
        let Some(mapping) = self.find(addr).copied() else {
            self.logger
                .error(format_args!("Read from unmapped memory: ${:04X}", addr));
            self.guest_fault(addr, FaultKind::UnmappedRead);
            return 0;
        };
        let phys = mapping.phys_start + (addr - mapping.virt_start) as u32;

        match mapping.backing_store {
            BackingStore::PrivRam => self.privram.read(phys),
            BackingStore::Mmu => self.mapping_table_byte(phys),
            store => {
                let result = match self.connection(store) {
                    Some(bus) => bus.read(phys),
                    None => Err(EmuError::MissingConnection(store)),
                };
                match result {
                    Ok(data) => data,
                    Err(e) => {
                        self.logger.error(format_args!("Read from ${:04X}: {}", addr, e));
                        self.record(e);
                        0
                    }
                }
            }
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        let Some(mapping) = self.find(addr).copied() else {
            self.logger.error(format_args!(
                "Write to unmapped memory: ${:04X}, ${:02X}",
                addr, data
            ));
            self.guest_fault(addr, FaultKind::UnmappedWrite);
            return;
        };
        let phys = mapping.phys_start + (addr - mapping.virt_start) as u32;

        match mapping.backing_store {
            BackingStore::PrivRam => self.privram.write(phys, data),
            BackingStore::Rom => {
                self.logger.error(format_args!(
                    "ROM write of ${:02X} to ${:04X} dropped",
                    data, addr
                ));
                self.guest_fault(addr, FaultKind::RomWrite);
            }
            BackingStore::Mmu => {
                self.logger
                    .error(format_args!("Mapping table is read-only: ${:04X}", addr));
            }
            store => {
                let result = match self.connection(store) {
                    Some(bus) => bus.write(phys, data),
                    None => Err(EmuError::MissingConnection(store)),
                };
                if let Err(e) = result {
                    self.logger.error(format_args!("Write to ${:04X}: {}", addr, e));
                    self.record(e);
                }
            }
        }
    }

    fn take_fault(&mut self) -> Option<EmuError> {
        self.fault.take()
    }
}
