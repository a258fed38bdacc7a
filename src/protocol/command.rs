//! Single-character command set of the serial line protocol.
use crate::driver::status::OpenMode;
use crate::infra::codec::frame::FrameKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Commands recognized by their leading byte. Argument bytes, if any, are
/// read by the engine afterwards.
pub enum Command {
    /// `v`
    SoftwareVersion,
    /// `V`
    HardwareVersion,
    /// `F`
    Status,
    /// `O`, `l`, `L`
    Open(OpenMode),
    /// `C`
    Close,
    /// `Sn`
    SetBitrate,
    /// `sXXXX`
    SetCustomTiming,
    /// `Zn`
    SetTimestamp,
    /// `En`
    SetErrorReport,
    /// `Dn`
    SetAutoRetransmitDisabled,
    /// `t`, `r`, `T`, `R`
    Send(FrameKind),
    /// `Mxxxxxxxx`
    SetFilterCode,
    /// `mxxxxxxxx`
    SetFilterMask,
    /// `h`, `?`
    Help,
}

impl Command {
    /// Recognize a command byte. Anything else is not a command.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let command = match byte {
            b'v' => Self::SoftwareVersion,
            b'V' => Self::HardwareVersion,
            b'F' => Self::Status,
            b'O' => Self::Open(OpenMode::Normal),
            b'l' => Self::Open(OpenMode::LoopBack),
            b'L' => Self::Open(OpenMode::ListenOnly),
            b'C' => Self::Close,
            b'S' => Self::SetBitrate,
            b's' => Self::SetCustomTiming,
            b'Z' => Self::SetTimestamp,
            b'E' => Self::SetErrorReport,
            b'D' => Self::SetAutoRetransmitDisabled,
            b'M' => Self::SetFilterCode,
            b'm' => Self::SetFilterMask,
            b'h' | b'?' => Self::Help,
            other => Self::Send(FrameKind::from_byte(other)?),
        };
        Some(command)
    }

    /// Whether the command answers with a single ack byte.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self, Self::Help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table() {
        assert_eq!(Command::from_byte(b'O'), Some(Command::Open(OpenMode::Normal)));
        assert_eq!(Command::from_byte(b'l'), Some(Command::Open(OpenMode::LoopBack)));
        assert_eq!(Command::from_byte(b'L'), Some(Command::Open(OpenMode::ListenOnly)));
        assert_eq!(Command::from_byte(b'?'), Some(Command::Help));
        assert_eq!(
            Command::from_byte(b'R'),
            Some(Command::Send(FrameKind { extended: true, remote: true }))
        );
        assert!(!Command::Help.is_acknowledged());
        assert!(Command::Close.is_acknowledged());
    }

    #[test]
    fn test_unknown_bytes() {
        for byte in [b'\r', b'\n', b'x', b'B', b'0', 0x00, 0xFF] {
            assert_eq!(Command::from_byte(byte), None);
        }
    }
}
