//! Conversion between [`CanFrame`] and its slcan text form.
//!
//! Grammar of a frame token (no separators):
//!
//! ```text
//! t iii l dd..   standard data frame   (3 id digits, DLC digit, 2*DLC data digits)
//! r iii l        standard remote frame
//! T iiiiiiii l dd..  extended data frame (8 id digits)
//! R iiiiiiii l   extended remote frame
//! ```
//!
//! Received frames are serialized with the same grammar, optionally followed
//! by a 4-digit timestamp, and always closed by `\r`. Remote frames never
//! carry data digits, whatever their DLC.
use core::ops::Deref;

use crate::driver::can_frame::{CanFrame, MAX_DATA_LEN};
use crate::driver::status::LastErrorCode;
use crate::error::ParseError;
use crate::infra::codec::hex::{hex_digit, hex_value, write_hex};

/// Line terminator of every command and record.
pub const TERMINATOR: u8 = b'\r';

/// Longest record: `T` + 8 id + DLC + 16 data + 4 timestamp + `\r`.
pub const MAX_RECORD_LEN: usize = 31;

//==================================================================================FRAME_KIND
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Frame flavour selected by the leading character.
pub struct FrameKind {
    pub extended: bool,
    pub remote: bool,
}

impl FrameKind {
    /// `t`, `r`, `T` or `R`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b't' => Some(Self { extended: false, remote: false }),
            b'r' => Some(Self { extended: false, remote: true }),
            b'T' => Some(Self { extended: true, remote: false }),
            b'R' => Some(Self { extended: true, remote: true }),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match (self.extended, self.remote) {
            (false, false) => b't',
            (false, true) => b'r',
            (true, false) => b'T',
            (true, true) => b'R',
        }
    }

    /// Number of identifier digits.
    pub fn id_digits(self) -> u8 {
        if self.extended {
            8
        } else {
            3
        }
    }
}

//==================================================================================FRAME_DECODER
/// Byte-fed decoder for the part of a frame token after its type character.
/// The protocol engine feeds it straight from the inbound queue.
#[derive(Debug)]
pub struct FrameDecoder {
    kind: FrameKind,
    id: u32,
    id_seen: u8,
    dlc: Option<u8>,
    data: [u8; MAX_DATA_LEN],
    nibbles: u8,
    position: usize,
    complete: bool,
}

impl FrameDecoder {
    pub fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            id: 0,
            id_seen: 0,
            dlc: None,
            data: [0; MAX_DATA_LEN],
            nibbles: 0,
            position: 0,
            complete: false,
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Consume one byte. Returns the frame once its last digit arrived; the
    /// terminator that follows is left to the caller.
    pub fn feed(&mut self, byte: u8) -> Result<Option<CanFrame>, ParseError> {
        if self.complete {
            return Err(ParseError::TrailingData { byte });
        }
        self.position += 1;
        if byte == TERMINATOR {
            return Err(ParseError::UnexpectedTerminator {
                position: self.position,
            });
        }
        let nibble = hex_value(byte).ok_or(ParseError::InvalidHexDigit { byte })?;

        if self.id_seen < self.kind.id_digits() {
            self.id = (self.id << 4) | nibble as u32;
            self.id_seen += 1;
            return Ok(None);
        }

        match self.dlc {
            None => {
                if nibble as usize > MAX_DATA_LEN {
                    return Err(ParseError::InvalidDlc { dlc: nibble });
                }
                self.dlc = Some(nibble);
                if self.kind.remote || nibble == 0 {
                    return self.finish().map(Some);
                }
                Ok(None)
            }
            Some(dlc) => {
                let index = (self.nibbles / 2) as usize;
                self.data[index] = (self.data[index] << 4) | nibble;
                self.nibbles += 1;
                if self.nibbles == 2 * dlc {
                    return self.finish().map(Some);
                }
                Ok(None)
            }
        }
    }

    fn finish(&mut self) -> Result<CanFrame, ParseError> {
        self.complete = true;
        let dlc = self.dlc.unwrap_or(0);
        CanFrame::from_raw(self.id, self.kind.extended, self.kind.remote, dlc, self.data)
            .ok_or(ParseError::IdentifierOutOfRange { id: self.id })
    }
}

/// Decode one complete frame token: type character, fields, then `\r`.
/// Bytes between the last field and the terminator are ignored.
pub fn decode_hex_command(bytes: &[u8]) -> Result<CanFrame, ParseError> {
    let (&kind_byte, rest) = bytes.split_first().ok_or(ParseError::Truncated)?;
    let kind = FrameKind::from_byte(kind_byte).ok_or(ParseError::UnknownFrameType { kind: kind_byte })?;

    let mut decoder = FrameDecoder::new(kind);
    let mut rest = rest.iter();
    let frame = loop {
        let &byte = rest.next().ok_or(ParseError::Truncated)?;
        if let Some(frame) = decoder.feed(byte)? {
            break frame;
        }
    };

    if rest.any(|&byte| byte == TERMINATOR) {
        Ok(frame)
    } else {
        Err(ParseError::Truncated)
    }
}

//==================================================================================ENCODED_RECORD
#[derive(Clone, Copy)]
/// Stack buffer holding one outbound record.
pub struct EncodedRecord {
    buf: [u8; MAX_RECORD_LEN],
    len: usize,
}

impl EncodedRecord {
    fn new() -> Self {
        Self {
            buf: [0; MAX_RECORD_LEN],
            len: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }

    fn push_hex(&mut self, value: u32, digits: usize) {
        write_hex(value, &mut self.buf[self.len..self.len + digits]);
        self.len += digits;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Deref for EncodedRecord {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl core::fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(text) => write!(f, "EncodedRecord({text:?})"),
            Err(_) => write!(f, "EncodedRecord({:?})", self.as_bytes()),
        }
    }
}

/// Serialize a frame; `timestamp` adds the 4-digit suffix before `\r`.
pub fn encode_frame(frame: &CanFrame, timestamp: Option<u16>) -> EncodedRecord {
    let kind = FrameKind {
        extended: frame.is_extended(),
        remote: frame.is_remote(),
    };
    let mut record = EncodedRecord::new();
    record.push(kind.to_byte());
    record.push_hex(frame.raw_id(), kind.id_digits() as usize);
    record.push(hex_digit(frame.dlc()));
    for &byte in frame.data() {
        record.push(hex_digit(byte >> 4));
        record.push(hex_digit(byte));
    }
    if let Some(timestamp) = timestamp {
        record.push_hex(timestamp as u32, 4);
    }
    record.push(TERMINATOR);
    record
}

/// Serialize a bus error report: `E` + 2-digit code [+ timestamp] + `\r`.
pub fn encode_error(code: LastErrorCode, timestamp: Option<u16>) -> EncodedRecord {
    let mut record = EncodedRecord::new();
    record.push(b'E');
    record.push_hex(code.code() as u32, 2);
    if let Some(timestamp) = timestamp {
        record.push_hex(timestamp as u32, 4);
    }
    record.push(TERMINATOR);
    record
}
