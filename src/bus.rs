//! Memory bus: the interface the CPU reads and writes through, and the
//! transaction protocol that carries accesses to peripheral actors.
//!
//! A peripheral is reached through two rendezvous (zero-capacity) channels,
//! an address bus and a data bus. The data bus has one line per direction so
//! that each end owns what it sends. A transaction is:
//!
//! - read: `{Read, addr}` on the address bus, then the byte comes back on the
//!   data bus;
//! - write: `{Write, addr}` on the address bus, then the byte goes out on the
//!   data bus.
//!
//! Because nothing is buffered, the requester cannot start a second
//! transaction until the peripheral has taken part in the first, which is
//! exactly the exclusivity of one shared electrical bus.

use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use crate::error::{EmuError, Result};

/// Trait for byte-addressed memory used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Little-endian word: low byte at `addr`, high byte at `addr + 1`.
    /// Two separate byte accesses, not atomic.
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_word(&mut self, addr: u16, data: u16) {
        self.write(addr, data as u8);
        self.write(addr.wrapping_add(1), (data >> 8) as u8);
    }

    /// Takes the first access error recorded since the last call, if any.
    /// The CPU polls this after every instruction.
    fn take_fault(&mut self) -> Option<EmuError> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rw {
    Read,
    Write,
}

/// Address-bus message: direction and physical address inside the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBus {
    pub rw: Rw,
    pub address: u32,
}

/// Data-bus message: one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBus {
    pub data: u8,
}

/// Creates the channel pair for one peripheral. The connection goes to the
/// requester (the MMU), the port to the peripheral actor.
pub fn channel(name: &'static str) -> (BusConnection, BusPort) {
    let (address_tx, address_rx) = sync_channel(0);
    let (to_device_tx, to_device_rx) = sync_channel(0);
    let (from_device_tx, from_device_rx) = sync_channel(0);

    let connection = BusConnection {
        name,
        address: address_tx,
        data_out: to_device_tx,
        data_in: from_device_rx,
    };
    let port = BusPort {
        address: address_rx,
        data_in: to_device_rx,
        data_out: from_device_tx,
    };
    (connection, port)
}

/// Requester end of a peripheral's buses. Dropping it closes the buses, which
/// ends the peripheral's receive loop.
pub struct BusConnection {
    name: &'static str,
    address: SyncSender<AddressBus>,
    data_out: SyncSender<DataBus>,
    data_in: Receiver<DataBus>,
}

impl BusConnection {
    /// One read transaction. Blocks until the peripheral replies.
    pub fn read(&self, address: u32) -> Result<u8> {
        self.address
            .send(AddressBus {
                rw: Rw::Read,
                address,
            })
            .map_err(|_| EmuError::BusDisconnected(self.name))?;
        let reply = self
            .data_in
            .recv()
            .map_err(|_| EmuError::BusDisconnected(self.name))?;
        Ok(reply.data)
    }

    /// One write transaction. Returns once the peripheral has taken the byte.
    pub fn write(&self, address: u32, data: u8) -> Result<()> {
        self.address
            .send(AddressBus {
                rw: Rw::Write,
                address,
            })
            .map_err(|_| EmuError::BusDisconnected(self.name))?;
        self.data_out
            .send(DataBus { data })
            .map_err(|_| EmuError::BusDisconnected(self.name))
    }
}

/// Peripheral end of the buses.
pub struct BusPort {
    address: Receiver<AddressBus>,
    data_in: Receiver<DataBus>,
    data_out: SyncSender<DataBus>,
}

impl BusPort {
    /// Waits for the next address-bus message. `None` once the requester has
    /// hung up.
    pub fn next_request(&self) -> Option<AddressBus> {
        self.address.recv().ok()
    }

    /// Second phase of a write: the byte on the data bus.
    pub fn receive_data(&self) -> Option<u8> {
        self.data_in.recv().ok().map(|d| d.data)
    }

    /// Second phase of a read: put the byte on the data bus.
    pub fn reply(&self, data: u8) -> bool {
        self.data_out.send(DataBus { data }).is_ok()
    }
}
