//! Wires the CPU, MMU and peripherals into a running system and takes it
//! down again.
//!
//! Start-up order: peripheral reset (the ROM loads its image), peripheral
//! actors start, CPU reset (the reset vector is fetched over the bus), CPU
//! driver thread starts. Shutdown runs the other way: stop flag, CPU thread
//! joined, MMU dropped so every bus closes, then the peripheral barrier.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::cpu::cpu::{CPU, Interrupt};
use crate::cpu::flags::Flags;
use crate::error::{EmuError, Result};
use crate::logger::Logger;
use crate::mmu::{self, BackingStore, Mapping, Mmu};
use crate::peripheral::Peripherals;
use crate::peripheral::gpu::Gpu;
use crate::peripheral::ram::Ram;
use crate::peripheral::rom::Rom;

/// How often `wait_for_interrupt` checks whether the CPU stopped on its own.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Register file as seen from outside the CPU thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub flags: Flags,
}

impl Registers {
    fn of(cpu: &CPU<Mmu>) -> Self {
        Self {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            sp: cpu.sp,
            pc: cpu.pc,
            flags: cpu.flags,
        }
    }
}

type CpuThread = JoinHandle<(CPU<Mmu>, Result<()>)>;

pub struct Machine {
    cpu: Option<CPU<Mmu>>,
    cpu_thread: Option<CpuThread>,
    peripherals: Peripherals,
    interrupts: Receiver<Interrupt>,
    stop: Arc<AtomicBool>,
    last_registers: Option<Registers>,
    is_reset: bool,
    runtime_limit: Duration,
    logger: Logger,
}

/// Bytes a store must hold so that every window onto it fits.
fn capacity(mappings: &[Mapping], store: BackingStore) -> usize {
    mappings
        .iter()
        .filter(|m| m.backing_store == store)
        .map(|m| m.phys_start as usize + m.size as usize)
        .max()
        .unwrap_or(0)
}

impl Machine {
    /// Builds every unit. The GPU prints to `output`. Fails on a malformed
    /// mapping table; nothing is started yet.
    pub fn new(config: &Config, logger: Logger, output: Box<dyn Write + Send>) -> Result<Self> {
        let mappings = config.mappings.clone().unwrap_or_else(mmu::default_mappings);
        mmu::validate_mappings(&mappings)?;

        let ram = Ram::new(capacity(&mappings, BackingStore::Ram), logger);
        let rom = Rom::new(
            capacity(&mappings, BackingStore::Rom),
            Some(config.rom_path.clone()),
            logger,
        );
        let gpu = Gpu::new(output, logger);
        let (peripherals, connections) = Peripherals::new(ram, rom, gpu, logger);

        let mmu = Mmu::new(mappings, connections, config.access_policy, logger)?;
        let mut cpu = CPU::new(mmu, logger);
        let (sender, interrupts) = mpsc::channel();
        cpu.connect_interrupts(sender);

        Ok(Self {
            cpu: Some(cpu),
            cpu_thread: None,
            peripherals,
            interrupts,
            stop: Arc::new(AtomicBool::new(false)),
            last_registers: None,
            is_reset: false,
            runtime_limit: config.runtime_limit,
            logger,
        })
    }

    /// Resets the peripherals, starts their actors, clears PrivRAM and
    /// resets the CPU.
    ///
    /// Peripherals can only be reset before their actors start. A repeated
    /// reset before `run` therefore resets the CPU and PrivRAM only: RAM
    /// keeps its contents and the ROM image is not reloaded.
    pub fn reset(&mut self) -> Result<()> {
        let Some(cpu) = self.cpu.as_mut() else {
            self.logger.warn("machine is running or halted, reset ignored");
            return Ok(());
        };
        if self.peripherals.is_running() {
            self.logger
                .warn("peripherals already running, only the CPU is reset");
        } else {
            self.peripherals.reset()?;
            self.peripherals.run()?;
        }
        cpu.bus.clear_privram();
        cpu.reset()?;
        self.is_reset = true;
        Ok(())
    }

    /// Starts the CPU driver thread, resetting first if needed.
    pub fn run(&mut self) -> Result<()> {
        if !self.is_reset {
            self.reset()?;
        }
        let Some(mut cpu) = self.cpu.take() else {
            self.logger.warn("machine is already running or halted");
            return Ok(());
        };

        self.stop.store(false, Ordering::Relaxed);
        let stop = Arc::clone(&self.stop);
        let handle = thread::Builder::new()
            .name("cpu".into())
            .spawn(move || {
                let result = cpu.run(&stop);
                (cpu, result)
            })
            .map_err(|source| EmuError::Spawn { name: "CPU", source })?;
        self.cpu_thread = Some(handle);
        Ok(())
    }

    /// Waits up to `timeout` for the CPU to raise an interrupt. Returns early
    /// with `None` if the CPU stops without raising one.
    pub fn wait_for_interrupt(&self, timeout: Duration) -> Option<Interrupt> {
        let deadline = Instant::now() + timeout;
        loop {
            let cpu_done = self
                .cpu_thread
                .as_ref()
                .is_none_or(|handle| handle.is_finished());
            if cpu_done {
                return self.interrupts.try_recv().ok();
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            match self.interrupts.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
                Ok(interrupt) => return Some(interrupt),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Stops everything and waits until all actors have left their loops.
    /// Returns the error that stopped the CPU, if any.
    pub fn halt(&mut self) -> Result<()> {
        self.logger.info("halting");
        self.stop.store(true, Ordering::Relaxed);

        let mut cpu_result = Ok(());
        if let Some(handle) = self.cpu_thread.take() {
            let (cpu, result) = handle
                .join()
                .map_err(|_| EmuError::ThreadPanicked("CPU"))?;
            self.last_registers = Some(Registers::of(&cpu));
            cpu_result = result;
            // Dropping the CPU drops the MMU and with it every bus connection.
            drop(cpu);
        } else if let Some(cpu) = self.cpu.take() {
            self.last_registers = Some(Registers::of(&cpu));
            drop(cpu);
        }

        self.peripherals.halt()?;
        cpu_result
    }

    /// Runs for at most `limit` of wall-clock time, then halts. Returns the
    /// interrupt that ended the run, or `None` if time ran out or the CPU
    /// stopped on its own.
    pub fn run_for(&mut self, limit: Duration) -> Result<Option<Interrupt>> {
        if let Err(e) = self.run() {
            if let Err(halt_error) = self.halt() {
                self.logger
                    .error(format_args!("halt after failed start: {}", halt_error));
            }
            return Err(e);
        }

        let interrupt = self.wait_for_interrupt(limit);
        match interrupt {
            Some(Interrupt::Break { pc }) => self
                .logger
                .info(format_args!("BRK at ${:04X}, stopping", pc)),
            None if self.is_cpu_running() => self
                .logger
                .info(format_args!("runtime limit of {:?} reached", limit)),
            None => {}
        }
        self.halt()?;
        Ok(interrupt)
    }

    /// `run_for` with the configured runtime limit.
    pub fn run_to_limit(&mut self) -> Result<Option<Interrupt>> {
        self.run_for(self.runtime_limit)
    }

    pub fn is_cpu_running(&self) -> bool {
        self.cpu_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Current registers when the CPU is idle, the final ones after `halt`,
    /// `None` while the CPU thread owns them.
    pub fn registers(&self) -> Option<Registers> {
        match &self.cpu {
            Some(cpu) => Some(Registers::of(cpu)),
            None => self.last_registers,
        }
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        if self.cpu_thread.is_some() || self.peripherals.is_running() {
            if let Err(e) = self.halt() {
                self.logger.error(format_args!("halt on drop: {}", e));
            }
        }
    }
}
