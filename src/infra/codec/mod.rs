//! slcan text codec: hex digit helpers and frame/record conversion.
pub mod frame;
pub mod hex;

pub use frame::{decode_hex_command, encode_error, encode_frame, EncodedRecord, FrameDecoder, FrameKind};
