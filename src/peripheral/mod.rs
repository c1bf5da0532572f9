//! Bus peripherals and the actors that run them.
//!
//! - **ram**: general-purpose read/write store.
//! - **rom**: read-only store loaded from a raw image file on reset.
//! - **gpu**: character output register at offset 0.
//!
//! Each peripheral owns its storage and runs on its own thread, answering
//! transactions from its `BusPort` until the requester hangs up.

pub mod gpu;
pub mod ram;
pub mod rom;

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

use crate::bus::{self, BusPort, Rw};
use crate::error::{EmuError, Result};
use crate::logger::Logger;
use crate::mmu::Connections;

use gpu::Gpu;
use ram::Ram;
use rom::Rom;

/// A device on the far side of a bus. Addresses are physical offsets
/// inside the device.
pub trait Peripheral: Send {
    fn name(&self) -> &'static str;
    fn reset(&mut self) -> Result<()>;
    fn read(&mut self, address: u32) -> u8;
    fn write(&mut self, address: u32, data: u8);
}

/// A peripheral bound to the peripheral end of its buses.
pub struct PeripheralActor {
    device: Box<dyn Peripheral>,
    port: BusPort,
    logger: Logger,
}

impl PeripheralActor {
    pub fn new(device: Box<dyn Peripheral>, port: BusPort, logger: Logger) -> Self {
        Self {
            device,
            port,
            logger,
        }
    }

    pub fn name(&self) -> &'static str {
        self.device.name()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.logger.info(format_args!("{} reset", self.name()));
        self.device.reset()
    }

    /// Serves transactions until the buses close, then hands the device back.
    pub fn run(self) -> Box<dyn Peripheral> {
        let Self {
            mut device,
            port,
            logger,
        } = self;
        logger.info(format_args!("{} run", device.name()));

        while let Some(request) = port.next_request() {
            match request.rw {
                Rw::Read => {
                    let data = device.read(request.address);
                    if !port.reply(data) {
                        logger.error(format_args!(
                            "{}: requester left during read of ${:X}",
                            device.name(),
                            request.address
                        ));
                        break;
                    }
                }
                Rw::Write => match port.receive_data() {
                    Some(data) => device.write(request.address, data),
                    None => {
                        logger.error(format_args!(
                            "{}: data bus closed during write to ${:X}",
                            device.name(),
                            request.address
                        ));
                        break;
                    }
                },
            }
        }

        logger.info(format_args!("{} halt", device.name()));
        device
    }
}

/// The RAM, ROM and GPU actors, managed as one unit.
pub struct Peripherals {
    idle: Vec<PeripheralActor>,
    running: Vec<(&'static str, JoinHandle<Box<dyn Peripheral>>)>,
    done_tx: Sender<&'static str>,
    done_rx: Receiver<&'static str>,
    logger: Logger,
}

impl Peripherals {
    /// Builds the actors and returns the requester ends of their buses.
    pub fn new(ram: Ram, rom: Rom, gpu: Gpu, logger: Logger) -> (Self, Connections) {
        let (ram_bus, ram_port) = bus::channel("RAM");
        let (rom_bus, rom_port) = bus::channel("ROM");
        let (gpu_bus, gpu_port) = bus::channel("GPU");

        let idle = vec![
            PeripheralActor::new(Box::new(rom), rom_port, logger),
            PeripheralActor::new(Box::new(ram), ram_port, logger),
            PeripheralActor::new(Box::new(gpu), gpu_port, logger),
        ];
        let connections = Connections {
            ram: Some(ram_bus),
            rom: Some(rom_bus),
            gpu: Some(gpu_bus),
        };

        let (done_tx, done_rx) = channel();
        let peripherals = Self {
            idle,
            running: Vec::new(),
            done_tx,
            done_rx,
            logger,
        };
        (peripherals, connections)
    }

    /// Resets every peripheral; the ROM loads its image here. Only possible
    /// before `run`, while this unit still owns the devices.
    pub fn reset(&mut self) -> Result<()> {
        if !self.running.is_empty() {
            self.logger.warn("peripherals already running, reset ignored");
            return Ok(());
        }
        for actor in &mut self.idle {
            actor.reset()?;
        }
        Ok(())
    }

    /// Starts one thread per peripheral.
    pub fn run(&mut self) -> Result<()> {
        for actor in self.idle.drain(..) {
            let name = actor.name();
            let done = self.done_tx.clone();
            let handle = thread::Builder::new()
                .name(name.to_lowercase())
                .spawn(move || {
                    let device = actor.run();
                    let _ = done.send(name);
                    device
                })
                .map_err(|source| EmuError::Spawn { name, source })?;
            self.running.push((name, handle));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// Waits until every actor has left its loop and returns the devices.
    ///
    /// The actors only stop once their buses close, so the MMU holding the
    /// `Connections` must be dropped first.
    pub fn halt(&mut self) -> Result<Vec<Box<dyn Peripheral>>> {
        for _ in 0..self.running.len() {
            match self.done_rx.recv() {
                Ok(name) => self.logger.debug(format_args!("{} reached the halt barrier", name)),
                Err(_) => break,
            }
        }

        let mut devices = Vec::with_capacity(self.running.len());
        for (name, handle) in self.running.drain(..) {
            let device = handle.join().map_err(|_| EmuError::ThreadPanicked(name))?;
            devices.push(device);
        }
        self.logger.info("peripherals halted");
        Ok(devices)
    }
}
