//! CAN controller driver: frame and timing types, the bxCAN register seam,
//! the open/close state machine and the interrupt-side receive/error pipeline.
pub mod bit_timing;
pub mod can_frame;
pub mod controller;
pub mod registers;
pub mod status;
pub mod traits;

pub use bit_timing::{BitTiming, Bitrate};
pub use can_frame::CanFrame;
pub use controller::{CanController, CanInterrupt};
pub use status::{BusStatus, DriverState, Filter, LastErrorCode, OpenMode};
pub use traits::{ErrorSink, FrameSink, NullSink};
