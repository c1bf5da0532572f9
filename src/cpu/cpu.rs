use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::{
    bus::Bus,
    cpu::{
        addressing::AddressMode,
        alu,
        dispatch::{self, Instruction, Opcode},
        flags::{FLAG_BREAK, Flags},
    },
    error::{EmuError, Result},
    logger::{LogLevel, Logger},
};

/// Reset vector lives at $FFFC/$FFFD; reset executes `JMP abs` from the byte before it.
pub const RESET_PC: u16 = 0xFFFB;
pub const STACK_PAGE: u16 = 0x0100;

/// Signals raised by the CPU towards whoever drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// BRK executed at `pc`.
    Break { pc: u16 },
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub flags: Flags,
    pub bus: B,
    pub halted: bool,
    logger: Logger,
    interrupts: Option<Sender<Interrupt>>,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B, logger: Logger) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            flags: Flags::default(),
            bus,
            halted: false,
            logger,
            interrupts: None,
        }
    }

    /// Where BRK reports to. Without a receiver BRK still stops the CPU.
    pub fn connect_interrupts(&mut self, sender: Sender<Interrupt>) {
        self.interrupts = Some(sender);
    }

    pub fn reset(&mut self) -> Result<()> {
        self.logger.info("CPU reset");

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.flags = Flags {
            int_disable: true,
            ..Flags::default()
        };
        self.halted = false;

        // The vector is fetched through the normal memory path.
        self.pc = RESET_PC;
        self.execute(Opcode {
            instruction: Instruction::Jmp,
            mode: AddressMode::Absolute,
        })?;
        self.logger
            .debug(format_args!("reset vector -> ${:04X}", self.pc));
        Ok(())
    }

    /// Executes instructions until the CPU halts or `stop` is raised.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        self.logger.info("CPU run");
        while !self.halted && !stop.load(Ordering::Relaxed) {
            self.step()?;
        }
        Ok(())
    }

    /// Fetches, decodes and executes one instruction.
    pub fn step(&mut self) -> Result<()> {
        if self.halted {
            return Ok(());
        }

        let pc = self.pc;
        let opcode = self.bus.read(pc);
        let Some(op) = dispatch::decode(opcode) else {
            self.logger
                .error(format_args!("illegal opcode ${:02X} at ${:04X}", opcode, pc));
            self.halted = true;
            return Err(EmuError::IllegalOpcode { opcode, pc });
        };
        if self.logger.enabled(LogLevel::Debug) {
            self.trace(pc, opcode, op);
        }

        let result = self.execute(op).and_then(|()| match self.bus.take_fault() {
            Some(fault) => Err(fault),
            None => Ok(()),
        });
        if let Err(e) = result {
            match e {
                EmuError::InvalidAddressMode { .. } => self
                    .logger
                    .error(format_args!("fatal dispatch-table inconsistency: {}", e)),
                _ => self.logger.error(format_args!("CPU stopped at ${:04X}: {}", pc, e)),
            }
            self.halted = true;
            return Err(e);
        }
        Ok(())
    }

    fn trace(&self, pc: u16, opcode: u8, op: Opcode) {
        self.logger.debug(format_args!(
            "{:04X}  {:02X}  {:<10} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            pc,
            opcode,
            op.to_string(),
            self.a,
            self.x,
            self.y,
            self.flags.to_byte(),
            self.sp
        ));
    }

    /// Runs one decoded instruction. Rejects modes the instruction does not
    /// implement; only a corrupt table can get here with one.
    pub fn execute(&mut self, op: Opcode) -> Result<()> {
        if !op.instruction.supports(op.mode) {
            return Err(invalid_mode(op));
        }

        use Instruction::*;
        match op.instruction {
            Adc => self.accumulate(op, alu::add_with_carry),
            Sbc => self.accumulate(op, alu::subtract_with_carry),
            And => self.accumulate(op, |_, a, v| a & v),
            Ora => self.accumulate(op, |_, a, v| a | v),
            Eor => self.accumulate(op, |_, a, v| a ^ v),
            Lda => self.accumulate(op, |_, _, v| v),
            Ldx => {
                let value = self.operand(op)?;
                self.x = value;
                self.flags.set_zero_and_negative(value);
                self.advance(op);
                Ok(())
            }
            Ldy => {
                let value = self.operand(op)?;
                self.y = value;
                self.flags.set_zero_and_negative(value);
                self.advance(op);
                Ok(())
            }
            Cmp => self.compare(op, self.a),
            Cpx => self.compare(op, self.x),
            Cpy => self.compare(op, self.y),
            Bit => self.bit(op),

            Asl => self.modify(op, alu::shift_left),
            Lsr => self.modify(op, alu::shift_right),
            Rol => self.modify(op, alu::rotate_left),
            Ror => self.modify(op, alu::rotate_right),
            Inc => self.modify(op, |_, v| v.wrapping_add(1)),
            Dec => self.modify(op, |_, v| v.wrapping_sub(1)),

            Sta => self.store(op, self.a),
            Stx => self.store(op, self.x),
            Sty => self.store(op, self.y),

            Bcc => self.branch(op, !self.flags.carry),
            Bcs => self.branch(op, self.flags.carry),
            Beq => self.branch(op, self.flags.zero),
            Bne => self.branch(op, !self.flags.zero),
            Bmi => self.branch(op, self.flags.negative),
            Bpl => self.branch(op, !self.flags.negative),
            Bvc => self.branch(op, !self.flags.overflow),
            Bvs => self.branch(op, self.flags.overflow),

            Jmp => {
                self.pc = self.address(op)?;
                Ok(())
            }
            Jsr => {
                let target = self.address(op)?;
                // Return address minus one: the last byte of the JSR.
                self.push_word(self.pc.wrapping_add(2));
                self.pc = target;
                Ok(())
            }
            Rts => {
                self.pc = self.pull_word().wrapping_add(1);
                Ok(())
            }
            Rti => {
                let status = self.pull();
                self.flags = Flags::from_byte(status);
                self.pc = self.pull_word();
                Ok(())
            }
            Brk => {
                self.brk();
                Ok(())
            }

            Pha => self.implied(op, |cpu| cpu.push(cpu.a)),
            Php => self.implied(op, |cpu| cpu.push(cpu.flags.to_byte() | FLAG_BREAK)),
            Pla => self.implied(op, |cpu| {
                cpu.a = cpu.pull();
                cpu.flags.set_zero_and_negative(cpu.a);
            }),
            Plp => self.implied(op, |cpu| {
                let status = cpu.pull();
                cpu.flags = Flags::from_byte(status);
            }),

            Clc => self.implied(op, |cpu| cpu.flags.carry = false),
            Sec => self.implied(op, |cpu| cpu.flags.carry = true),
            Cli => self.implied(op, |cpu| cpu.flags.int_disable = false),
            Sei => self.implied(op, |cpu| cpu.flags.int_disable = true),
            Clv => self.implied(op, |cpu| cpu.flags.overflow = false),
            Cld => self.implied(op, |cpu| cpu.flags.decimal = false),
            Sed => self.implied(op, |cpu| {
                cpu.logger
                    .warn("decimal mode set: ADC/SBC stay binary (BCD is not emulated)");
                cpu.flags.decimal = true;
            }),

            Inx => self.implied(op, |cpu| {
                cpu.x = cpu.x.wrapping_add(1);
                cpu.flags.set_zero_and_negative(cpu.x);
            }),
            Iny => self.implied(op, |cpu| {
                cpu.y = cpu.y.wrapping_add(1);
                cpu.flags.set_zero_and_negative(cpu.y);
            }),
            Dex => self.implied(op, |cpu| {
                cpu.x = cpu.x.wrapping_sub(1);
                cpu.flags.set_zero_and_negative(cpu.x);
            }),
            Dey => self.implied(op, |cpu| {
                cpu.y = cpu.y.wrapping_sub(1);
                cpu.flags.set_zero_and_negative(cpu.y);
            }),

            Tax => self.implied(op, |cpu| {
                cpu.x = cpu.a;
                cpu.flags.set_zero_and_negative(cpu.x);
            }),
            Tay => self.implied(op, |cpu| {
                cpu.y = cpu.a;
                cpu.flags.set_zero_and_negative(cpu.y);
            }),
            Txa => self.implied(op, |cpu| {
                cpu.a = cpu.x;
                cpu.flags.set_zero_and_negative(cpu.a);
            }),
            Tya => self.implied(op, |cpu| {
                cpu.a = cpu.y;
                cpu.flags.set_zero_and_negative(cpu.a);
            }),
            Tsx => self.implied(op, |cpu| {
                cpu.x = cpu.sp;
                cpu.flags.set_zero_and_negative(cpu.x);
            }),
            Txs => self.implied(op, |cpu| cpu.sp = cpu.x),

            Nop => self.implied(op, |_| {}),
        }
    }

    fn advance(&mut self, op: Opcode) {
        self.pc = self.pc.wrapping_add(op.mode.byte_len());
    }

    fn address(&mut self, op: Opcode) -> Result<u16> {
        self.effective_address(op.mode).ok_or_else(|| invalid_mode(op))
    }

    fn operand(&mut self, op: Opcode) -> Result<u8> {
        self.operand_value(op.mode).ok_or_else(|| invalid_mode(op))
    }

    /// A <- f(A, operand), then Z/N from the result.
    fn accumulate(&mut self, op: Opcode, f: impl FnOnce(&mut Flags, u8, u8) -> u8) -> Result<()> {
        let value = self.operand(op)?;
        self.a = f(&mut self.flags, self.a, value);
        self.flags.set_zero_and_negative(self.a);
        self.advance(op);
        Ok(())
    }

    fn compare(&mut self, op: Opcode, register: u8) -> Result<()> {
        let value = self.operand(op)?;
        alu::compare(&mut self.flags, register, value);
        self.advance(op);
        Ok(())
    }

    /// Bit 7 -> N, bit 6 -> V, Z from A & M.
    fn bit(&mut self, op: Opcode) -> Result<()> {
        let value = self.operand(op)?;
        self.flags.negative = value & 0x80 != 0;
        self.flags.overflow = value & 0x40 != 0;
        self.flags.zero = value & self.a == 0;
        self.advance(op);
        Ok(())
    }

    /// Read-modify-write on A or memory, then Z/N from the result.
    fn modify(&mut self, op: Opcode, f: impl FnOnce(&mut Flags, u8) -> u8) -> Result<()> {
        let result = if op.mode == AddressMode::Accumulator {
            self.a = f(&mut self.flags, self.a);
            self.a
        } else {
            let addr = self.address(op)?;
            let value = self.bus.read(addr);
            let result = f(&mut self.flags, value);
            self.bus.write(addr, result);
            result
        };
        self.flags.set_zero_and_negative(result);
        self.advance(op);
        Ok(())
    }

    fn store(&mut self, op: Opcode, value: u8) -> Result<()> {
        let addr = self.address(op)?;
        self.bus.write(addr, value);
        self.advance(op);
        Ok(())
    }

    fn branch(&mut self, op: Opcode, condition: bool) -> Result<()> {
        if op.mode != AddressMode::Relative {
            return Err(invalid_mode(op));
        }
        let next = self.pc.wrapping_add(op.mode.byte_len());
        self.pc = if condition {
            let offset = alu::to_signed(self.next_byte());
            next.wrapping_add_signed(offset)
        } else {
            next
        };
        Ok(())
    }

    fn implied(&mut self, op: Opcode, f: impl FnOnce(&mut Self)) -> Result<()> {
        if op.mode != AddressMode::Implied {
            return Err(invalid_mode(op));
        }
        f(self);
        self.advance(op);
        Ok(())
    }

    /// Sets B and signals the interrupt; there is no vectoring, so the CPU stops.
    fn brk(&mut self) {
        let pc = self.pc;
        self.flags.brk = true;
        self.pc = self.pc.wrapping_add(AddressMode::Implied.byte_len());
        self.halted = true;
        self.logger.info(format_args!("BRK at ${:04X}", pc));
        if let Some(interrupts) = &self.interrupts {
            if interrupts.send(Interrupt::Break { pc }).is_err() {
                self.logger.warn("BRK raised with nobody listening");
            }
        }
    }

    pub fn push(&mut self, value: u8) {
        let addr = STACK_PAGE | self.sp as u16;
        self.bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = STACK_PAGE | self.sp as u16;
        self.bus.read(addr)
    }

    /// High byte first, so the low byte ends up on top.
    pub fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    pub fn pull_word(&mut self) -> u16 {
        let lo = self.pull() as u16;
        let hi = self.pull() as u16;
        (hi << 8) | lo
    }
}

fn invalid_mode(op: Opcode) -> EmuError {
    EmuError::InvalidAddressMode {
        instruction: op.instruction,
        mode: op.mode,
    }
}
