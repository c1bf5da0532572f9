//! MOS 6502 execution engine.
//!
//! Documented instruction set only; decimal mode is a flag without BCD
//! arithmetic. Memory goes through the `Bus` trait, normally the MMU.

pub mod addressing;
pub mod alu;
pub mod cpu;
pub mod dispatch;
pub mod flags;
