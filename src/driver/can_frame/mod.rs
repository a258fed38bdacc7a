//! In-memory representation of a classic CAN frame as handled by the bridge.
use embedded_can::{ExtendedId, Id, StandardId};

/// Largest classic CAN payload.
pub const MAX_DATA_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Classic CAN frame (no CAN-FD). Data frames carry `dlc` payload bytes;
/// remote frames keep `dlc` only for signaling and transmit no payload.
pub struct CanFrame {
    id: Id,
    remote: bool,
    dlc: u8,
    data: [u8; MAX_DATA_LEN],
}

impl CanFrame {
    /// Data frame. Returns `None` when `data` is longer than eight bytes.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DATA_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len() as u8,
            data: buf,
        })
    }

    /// Remote (RTR) frame requesting `dlc` bytes. Returns `None` when `dlc > 8`.
    pub fn new_remote(id: impl Into<Id>, dlc: u8) -> Option<Self> {
        if dlc as usize > MAX_DATA_LEN {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            dlc,
            data: [0; MAX_DATA_LEN],
        })
    }

    /// Build from raw parts, checking the identifier range for its width.
    pub fn from_raw(raw_id: u32, extended: bool, remote: bool, dlc: u8, data: [u8; 8]) -> Option<Self> {
        let id = if extended {
            Id::Extended(ExtendedId::new(raw_id)?)
        } else {
            Id::Standard(StandardId::new(u16::try_from(raw_id).ok()?)?)
        };
        if remote {
            Self::new_remote(id, dlc)
        } else if dlc as usize <= MAX_DATA_LEN {
            Self::new_data(id, &data[..dlc as usize])
        } else {
            None
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Identifier as a plain number (11 or 29 significant bits).
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Payload bytes that go on the wire: empty for remote frames.
    pub fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }

    /// Full eight-byte payload buffer, zero padded.
    pub(crate) fn raw_data(&self) -> &[u8; MAX_DATA_LEN] {
        &self.data
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::new_data(id, data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        Self::new_remote(id, u8::try_from(dlc).ok()?)
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.is_extended()
    }

    #[inline]
    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    #[inline]
    fn id(&self) -> Id {
        self.id
    }

    #[inline]
    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        self.data()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "CanFrame {{ id: {:#x}, ext: {}, rtr: {}, dlc: {}, data: {=[u8]:02x} }}",
            self.raw_id(),
            self.is_extended(),
            self.remote,
            self.dlc,
            self.data()
        )
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
