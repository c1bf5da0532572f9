//! 6502 processor status register (P) flag bits.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3; // Settable, but ADC/SBC stay binary
pub const FLAG_BREAK: u8 = 1 << 4;
pub const FLAG_UNUSED: u8 = 1 << 5; // Always 1 when pushed
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// Unpacked status register. Packed only for PHP/PLP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub carry: bool,
    pub zero: bool,
    pub int_disable: bool,
    pub decimal: bool,
    pub brk: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Flags {
    pub fn to_byte(self) -> u8 {
        let mut p = FLAG_UNUSED;
        for (set, bit) in [
            (self.carry, FLAG_CARRY),
            (self.zero, FLAG_ZERO),
            (self.int_disable, FLAG_INTERRUPT_DISABLE),
            (self.decimal, FLAG_DECIMAL),
            (self.brk, FLAG_BREAK),
            (self.overflow, FLAG_OVERFLOW),
            (self.negative, FLAG_NEGATIVE),
        ] {
            if set {
                p |= bit;
            }
        }
        p
    }

    pub fn from_byte(p: u8) -> Self {
        Self {
            carry: p & FLAG_CARRY != 0,
            zero: p & FLAG_ZERO != 0,
            int_disable: p & FLAG_INTERRUPT_DISABLE != 0,
            decimal: p & FLAG_DECIMAL != 0,
            brk: p & FLAG_BREAK != 0,
            overflow: p & FLAG_OVERFLOW != 0,
            negative: p & FLAG_NEGATIVE != 0,
        }
    }

    pub fn set_zero_and_negative(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }
}
