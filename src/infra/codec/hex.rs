//! ASCII hexadecimal digit helpers shared by the frame codec and the protocol engine.

/// Upper-case digits used for every hex field the bridge emits.
pub const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Value of an ASCII hex digit (either case).
pub fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Upper-case digit for the low nibble of `value`.
pub fn hex_digit(value: u8) -> u8 {
    HEX_DIGITS[(value & 0x0F) as usize]
}

/// Write the `out.len()` least significant nibbles of `value`, most significant first.
pub fn write_hex(value: u32, out: &mut [u8]) {
    let digits = out.len();
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 4 * (digits - 1 - i);
        *slot = hex_digit((value >> shift) as u8);
    }
}

/// Parse a run of hex digits (at most eight) into a number.
pub fn parse_hex(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    digits
        .iter()
        .try_fold(0u32, |acc, &byte| Some((acc << 4) | hex_value(byte)? as u32))
}
