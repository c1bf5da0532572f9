//! emu6502: a MOS 6502 emulator whose memory lives behind a message-passing bus.
//!
//! The CPU talks to a single `Mmu`; the MMU translates each virtual address
//! through its mapping table and either serves it from CPU-local PrivRAM or
//! forwards it as a blocking bus transaction to a peripheral actor running on
//! its own thread.
//!
//! ## Modules
//!
//! - **bus** – `Bus` trait the CPU reads and writes through; rendezvous
//!   channels (`AddressBus`/`DataBus`) between requester and peripheral
//! - **cpu** – documented 6502 instruction set, flag arithmetic, dispatch table
//! - **mmu** – mapping table, validation, virtual-to-physical translation
//! - **privram** – synchronous store private to the CPU
//! - **peripheral** – RAM, ROM and character GPU actors and their halt barrier
//! - **machine** – reset, run and halt ordering for the whole system
//! - **config**, **error**, **logger** – plain-value settings, `EmuError`,
//!   coloured levelled diagnostics

pub mod bus;
pub mod config;
pub mod cpu;
pub mod error;
pub mod logger;
pub mod machine;
pub mod mmu;
pub mod peripheral;
pub mod privram;
