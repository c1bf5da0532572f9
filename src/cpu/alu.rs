//! Flag arithmetic shared by the instructions.
//!
//! Decimal mode is not implemented: ADC and SBC are binary whatever the D
//! flag says.

use crate::cpu::flags::Flags;

/// Two's-complement value of an 8-bit operand.
pub fn to_signed(value: u8) -> i16 {
    value as i16 - ((value as i16 & 0x80) << 1)
}

/// `x + y + C`. Sets C, V, Z, N.
pub fn add_with_carry(flags: &mut Flags, x: u8, y: u8) -> u8 {
    let carry_in = flags.carry as u16;
    let sum = x as u16 + y as u16 + carry_in;

    // V = carry into bit 7 XOR carry out of bit 7.
    let c6 = ((x & 0x7F) as u16 + (y & 0x7F) as u16 + carry_in) >> 7;
    let c7 = sum >> 8;
    flags.overflow = (c6 ^ c7) & 1 == 1;
    flags.carry = c7 != 0;

    let result = sum as u8;
    flags.set_zero_and_negative(result);
    result
}

/// `x + !y + carry_in`: the 6502 subtract, with the raw carry/overflow out.
fn subtract(x: u8, y: u8, carry_in: bool) -> (u8, bool, bool) {
    let c = carry_in as u16;
    let inverted = !y;
    let sum = x as u16 + inverted as u16 + c;

    let signed = to_signed(x) + to_signed(inverted) + c as i16;
    let overflow = !(-128..=127).contains(&signed);
    let carry = sum >> 8 != 0;
    (sum as u8, carry, overflow)
}

/// `x - y - !C`. Sets C, V, Z, N.
pub fn subtract_with_carry(flags: &mut Flags, x: u8, y: u8) -> u8 {
    let (result, carry, overflow) = subtract(x, y, flags.carry);
    flags.carry = carry;
    flags.overflow = overflow;
    flags.set_zero_and_negative(result);
    result
}

/// CMP/CPX/CPY: `x - y` with C, Z, N set. V is left alone.
pub fn compare(flags: &mut Flags, x: u8, y: u8) {
    let (result, carry, _) = subtract(x, y, true);
    flags.carry = carry;
    flags.set_zero_and_negative(result);
}

/// ASL: shifts in 0, bit 7 goes to C.
pub fn shift_left(flags: &mut Flags, value: u8) -> u8 {
    flags.carry = value & 0x80 != 0;
    value << 1
}

/// LSR: shifts in 0, bit 0 goes to C.
pub fn shift_right(flags: &mut Flags, value: u8) -> u8 {
    flags.carry = value & 0x01 != 0;
    value >> 1
}

/// ROL: old C into bit 0, bit 7 to C.
pub fn rotate_left(flags: &mut Flags, value: u8) -> u8 {
    let carry_in = flags.carry as u8;
    flags.carry = value & 0x80 != 0;
    (value << 1) | carry_in
}

/// ROR: old C into bit 7, bit 0 to C.
pub fn rotate_right(flags: &mut Flags, value: u8) -> u8 {
    let carry_in = (flags.carry as u8) << 7;
    flags.carry = value & 0x01 != 0;
    (value >> 1) | carry_in
}
