//! Plain state and status types of the CAN controller.
use embedded_can::ErrorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Bus participation selected when opening the channel.
pub enum OpenMode {
    #[default]
    Normal,
    /// Internal loopback: transmitted frames are received back, bus untouched.
    LoopBack,
    /// Silent: receives, never acknowledges nor transmits.
    ListenOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    #[default]
    Closed,
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Single acceptance filter in 32-bit identifier/mask form, expressed the way
/// the protocol does: bits set in `mask` are "don't care".
pub struct Filter {
    pub code: u32,
    pub mask: u32,
}

impl Filter {
    /// Accept every frame.
    pub const ACCEPT_ALL: Filter = Filter {
        code: 0,
        mask: 0xFFFF_FFFF,
    };

    /// Whether a frame with the given `RIxR`-layout identifier word passes.
    pub fn accepts(&self, identifier_word: u32) -> bool {
        (identifier_word ^ self.code) & !self.mask == 0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::ACCEPT_ALL
    }
}

//==================================================================================LAST_ERROR_CODE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// 3-bit last-error-code field of the error status register.
pub enum LastErrorCode {
    NoError = 0,
    Stuff = 1,
    Form = 2,
    Acknowledgment = 3,
    BitRecessive = 4,
    BitDominant = 5,
    Crc = 6,
    SetBySoftware = 7,
}

impl LastErrorCode {
    /// Decode the low three bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Self::NoError,
            1 => Self::Stuff,
            2 => Self::Form,
            3 => Self::Acknowledgment,
            4 => Self::BitRecessive,
            5 => Self::BitDominant,
            6 => Self::Crc,
            _ => Self::SetBySoftware,
        }
    }

    /// Raw code as reported on the serial line.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Closest generic classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stuff => ErrorKind::Stuff,
            Self::Form => ErrorKind::Form,
            Self::Acknowledgment => ErrorKind::Acknowledge,
            Self::BitRecessive | Self::BitDominant => ErrorKind::Bit,
            Self::Crc => ErrorKind::Crc,
            Self::NoError | Self::SetBySoftware => ErrorKind::Other,
        }
    }
}

impl embedded_can::Error for LastErrorCode {
    fn kind(&self) -> ErrorKind {
        LastErrorCode::kind(self)
    }
}

//==================================================================================BUS_STATUS
bitflags::bitflags! {
    /// Status byte reported by the `F` command.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct BusStatus: u8 {
        const RX_FIFO_FULL = 1 << 0;
        const TX_FIFO_FULL = 1 << 1;
        const ERROR_WARNING = 1 << 2;
        const DATA_OVERRUN = 1 << 3;
        const ERROR_PASSIVE = 1 << 5;
        const ARBITRATION_LOST = 1 << 6;
        const BUS_OFF = 1 << 7;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BusStatus {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "BusStatus({=u8:#04x})", self.bits())
    }
}
