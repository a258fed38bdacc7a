//! Capability interfaces the interrupt handler reports into. Both are
//! registered once at startup and invoked fire-and-forget from interrupt
//! context: implementations must not block or allocate.
use crate::driver::{can_frame::CanFrame, status::LastErrorCode};

/// Receives every frame drained from the hardware FIFO.
pub trait FrameSink {
    fn on_frame(&mut self, frame: &CanFrame, timestamp: u16);
}

/// Receives every bus error flagged by the peripheral.
pub trait ErrorSink {
    fn on_bus_error(&mut self, code: LastErrorCode, timestamp: u16);
}

#[derive(Clone, Copy, Debug, Default)]
/// Sink that drops everything.
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_frame(&mut self, _frame: &CanFrame, _timestamp: u16) {}
}

impl ErrorSink for NullSink {
    fn on_bus_error(&mut self, _code: LastErrorCode, _timestamp: u16) {}
}
