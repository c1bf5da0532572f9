//! Addressing modes and effective-address resolution.
//!
//! While an instruction executes, `pc` still points at its opcode; operand
//! bytes are read from `pc + 1` and `pc + 2`, and `pc` moves past the whole
//! instruction afterwards.

use std::fmt;

use crate::bus::Bus;
use crate::cpu::cpu::CPU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Accumulator,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Immediate,
    Implied,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
}

impl AddressMode {
    /// Instruction length in bytes, opcode included.
    pub const fn byte_len(self) -> u16 {
        match self {
            AddressMode::Accumulator | AddressMode::Implied => 1,
            AddressMode::Immediate
            | AddressMode::IndirectX
            | AddressMode::IndirectY
            | AddressMode::Relative
            | AddressMode::ZeroPage
            | AddressMode::ZeroPageX
            | AddressMode::ZeroPageY => 2,
            AddressMode::Absolute
            | AddressMode::AbsoluteX
            | AddressMode::AbsoluteY
            | AddressMode::Indirect => 3,
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notation = match self {
            AddressMode::Accumulator => "A",
            AddressMode::Absolute => "abs",
            AddressMode::AbsoluteX => "abs,X",
            AddressMode::AbsoluteY => "abs,Y",
            AddressMode::Immediate => "#",
            AddressMode::Implied => "impl",
            AddressMode::Indirect => "ind",
            AddressMode::IndirectX => "X,ind",
            AddressMode::IndirectY => "ind,Y",
            AddressMode::Relative => "rel",
            AddressMode::ZeroPage => "zpg",
            AddressMode::ZeroPageX => "zpg,X",
            AddressMode::ZeroPageY => "zpg,Y",
        };
        f.write_str(notation)
    }
}

impl<B: Bus> CPU<B> {
    /// First operand byte.
    pub(crate) fn next_byte(&mut self) -> u8 {
        self.bus.read(self.pc.wrapping_add(1))
    }

    /// First two operand bytes as a little-endian word.
    pub(crate) fn next_word(&mut self) -> u16 {
        self.bus.read_word(self.pc.wrapping_add(1))
    }

    /// Pointer stored in the zero page; the high byte wraps to $00.
    fn zero_page_word(&mut self, zp: u8) -> u16 {
        let lo = self.bus.read(zp as u16) as u16;
        let hi = self.bus.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Effective address for modes that name a memory location. `None` for
    /// modes without one (accumulator, implied, immediate, relative).
    pub(crate) fn effective_address(&mut self, mode: AddressMode) -> Option<u16> {
        let addr = match mode {
            AddressMode::ZeroPage => self.next_byte() as u16,
            // Indexed zero page never leaves page 0.
            AddressMode::ZeroPageX => self.next_byte().wrapping_add(self.x) as u16,
            AddressMode::ZeroPageY => self.next_byte().wrapping_add(self.y) as u16,
            AddressMode::Absolute => self.next_word(),
            AddressMode::AbsoluteX => self.next_word().wrapping_add(self.x as u16),
            AddressMode::AbsoluteY => self.next_word().wrapping_add(self.y as u16),
            AddressMode::Indirect => {
                let ptr = self.next_word();
                self.bus.read_word(ptr)
            }
            AddressMode::IndirectX => {
                let zp = self.next_byte().wrapping_add(self.x);
                self.zero_page_word(zp)
            }
            AddressMode::IndirectY => {
                let zp = self.next_byte();
                self.zero_page_word(zp).wrapping_add(self.y as u16)
            }
            AddressMode::Accumulator
            | AddressMode::Implied
            | AddressMode::Immediate
            | AddressMode::Relative => return None,
        };
        Some(addr)
    }

    /// Operand value: the immediate byte, or the byte at the effective address.
    pub(crate) fn operand_value(&mut self, mode: AddressMode) -> Option<u8> {
        match mode {
            AddressMode::Immediate => Some(self.next_byte()),
            _ => self.effective_address(mode).map(|addr| self.bus.read(addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::{TestBus, new_cpu};

    fn cpu_with_operands(bytes: &[u8]) -> CPU<TestBus> {
        let mut bus = TestBus::new();
        bus.mem[0x8000..0x8000 + bytes.len()].copy_from_slice(bytes);
        let mut cpu = new_cpu(bus);
        cpu.pc = 0x8000;
        cpu
    }

    #[test]
    fn byte_lengths() {
        assert_eq!(AddressMode::Implied.byte_len(), 1);
        assert_eq!(AddressMode::Accumulator.byte_len(), 1);
        assert_eq!(AddressMode::Relative.byte_len(), 2);
        assert_eq!(AddressMode::IndirectY.byte_len(), 2);
        assert_eq!(AddressMode::Indirect.byte_len(), 3);
        assert_eq!(AddressMode::AbsoluteX.byte_len(), 3);
    }

    #[test]
    fn zero_page_x_wraps_inside_page_zero() {
        let mut cpu = cpu_with_operands(&[0xB5, 0xFF]);
        cpu.x = 0x02;
        assert_eq!(cpu.effective_address(AddressMode::ZeroPageX), Some(0x0001));
    }

    #[test]
    fn zero_page_y_wraps_inside_page_zero() {
        let mut cpu = cpu_with_operands(&[0xB6, 0x80]);
        cpu.y = 0x90;
        assert_eq!(cpu.effective_address(AddressMode::ZeroPageY), Some(0x0010));
    }

    #[test]
    fn absolute_indexed_crosses_pages() {
        let mut cpu = cpu_with_operands(&[0xBD, 0xF0, 0x12]);
        cpu.x = 0x20;
        assert_eq!(cpu.effective_address(AddressMode::AbsoluteX), Some(0x1310));
        cpu.y = 0x01;
        assert_eq!(cpu.effective_address(AddressMode::AbsoluteY), Some(0x12F1));
    }

    #[test]
    fn indirect_reads_pointer_word() {
        let mut cpu = cpu_with_operands(&[0x6C, 0x00, 0x30]);
        cpu.bus.mem[0x3000] = 0x34;
        cpu.bus.mem[0x3001] = 0x12;
        assert_eq!(cpu.effective_address(AddressMode::Indirect), Some(0x1234));
    }

    #[test]
    fn indirect_x_indexes_the_pointer() {
        let mut cpu = cpu_with_operands(&[0xA1, 0x20]);
        cpu.x = 0x04;
        cpu.bus.mem[0x24] = 0x00;
        cpu.bus.mem[0x25] = 0x30;
        assert_eq!(cpu.effective_address(AddressMode::IndirectX), Some(0x3000));
    }

    #[test]
    fn indirect_y_indexes_the_target() {
        let mut cpu = cpu_with_operands(&[0xB1, 0x20]);
        cpu.y = 0x10;
        cpu.bus.mem[0x20] = 0xF8;
        cpu.bus.mem[0x21] = 0x30;
        assert_eq!(cpu.effective_address(AddressMode::IndirectY), Some(0x3108));
    }

    #[test]
    fn immediate_has_a_value_but_no_address() {
        let mut cpu = cpu_with_operands(&[0xA9, 0x42]);
        assert_eq!(cpu.effective_address(AddressMode::Immediate), None);
        assert_eq!(cpu.operand_value(AddressMode::Immediate), Some(0x42));
        assert_eq!(cpu.operand_value(AddressMode::Implied), None);
    }
}
