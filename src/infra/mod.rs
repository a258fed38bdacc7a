//! Infrastructure shared by the driver and the protocol engine: the
//! inter-context byte queues and the slcan text codec.
pub mod codec;
pub mod queue;
