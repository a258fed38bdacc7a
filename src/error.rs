//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (peripheral handshake,
//! protocol token parsing, settings persistence, command execution).
use thiserror_no_std::Error;

//==================================================================================DRIVER_ERROR
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Acknowledgment bit the driver waits for after a mode request.
pub enum Handshake {
    /// Master reset bit self-clearing after a peripheral reset.
    Reset,
    /// `INAK` set after an initialization request.
    EnterInitialization,
    /// `INAK` cleared after leaving initialization.
    LeaveInitialization,
    /// `SLAK` set after a sleep request.
    EnterSleep,
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures reported synchronously by the CAN controller driver.
pub enum DriverError {
    /// The peripheral never acknowledged a mode change within the spin limit.
    #[error("Peripheral handshake timed out: {0:?}")]
    Timeout(Handshake),
    /// Every transmit mailbox is occupied.
    #[error("No free transmit mailbox")]
    Busy,
    /// The operation needs an open channel.
    #[error("CAN channel is closed")]
    Closed,
}

//==================================================================================PARSE_ERROR
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Malformed ASCII protocol tokens.
pub enum ParseError {
    /// `\r` arrived before the field at `position` was complete.
    #[error("Terminator received before field {position} was complete")]
    UnexpectedTerminator { position: usize },
    /// A byte that is not a hexadecimal digit appeared in a hex field.
    #[error("Invalid hex digit: {byte:#04x}")]
    InvalidHexDigit { byte: u8 },
    /// Data length code above 8.
    #[error("Invalid data length code: {dlc}")]
    InvalidDlc { dlc: u8 },
    /// Identifier does not fit the 11-bit or 29-bit range of its frame type.
    #[error("Identifier out of range: {id:#x}")]
    IdentifierOutOfRange { id: u32 },
    /// The leading character is not one of `t`, `r`, `T`, `R`.
    #[error("Unknown frame type: {kind:#04x}")]
    UnknownFrameType { kind: u8 },
    /// Input ended before the token was complete.
    #[error("Token truncated")]
    Truncated,
    /// A byte fed to a decoder whose frame is already complete.
    #[error("Byte after a complete frame: {byte:#04x}")]
    TrailingData { byte: u8 },
    /// Single-digit argument outside its accepted set.
    #[error("Invalid argument: {byte:#04x}")]
    InvalidArgument { byte: u8 },
}

//==================================================================================SETTINGS_ERROR
#[derive(Error, Debug)]
/// Persistence collaborator failures while loading or saving settings.
pub enum SettingsError<E: core::fmt::Debug> {
    /// Reading the word stored under `key` failed.
    #[error("Settings read failed for key {key}: {reason:?}")]
    Read { key: u16, reason: E },
    /// Writing the word stored under `key` failed.
    #[error("Settings write failed for key {key}: {reason:?}")]
    Write { key: u16, reason: E },
    /// The driver rejected a restored value.
    #[error("Applying stored settings failed: {0}")]
    Apply(#[from] DriverError),
}

//==================================================================================COMMAND_ERROR
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons a protocol command is answered with BEL.
pub enum CommandError {
    /// Driver refused or failed the operation.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The command arguments were malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
