//! State shared between the main loop and the interrupt handlers.
//!
//! The firmware places one [`BridgeShared`] in a `static`. The transport
//! receive callback feeds `inbound`, the CAN interrupt reports through a
//! [`FrameReporter`] into `outbound`, and the protocol engine owns the rest.
use core::sync::atomic::{AtomicBool, Ordering};

use crate::driver::can_frame::CanFrame;
use crate::driver::status::LastErrorCode;
use crate::driver::traits::{ErrorSink, FrameSink};
use crate::infra::codec::frame::{encode_error, encode_frame};
use crate::infra::queue::SharedByteQueue;

//==================================================================================REPORT_FLAGS
/// Output options consulted from interrupt context.
pub struct ReportFlags {
    timestamp: AtomicBool,
    errors: AtomicBool,
}

impl ReportFlags {
    pub const fn new() -> Self {
        Self {
            timestamp: AtomicBool::new(false),
            errors: AtomicBool::new(false),
        }
    }

    /// Append the 4-digit timestamp to received frames and error reports.
    pub fn timestamp(&self) -> bool {
        self.timestamp.load(Ordering::Relaxed)
    }

    pub fn set_timestamp(&self, enabled: bool) {
        self.timestamp.store(enabled, Ordering::Relaxed);
    }

    /// Emit `E` records for bus errors.
    pub fn errors(&self) -> bool {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn set_errors(&self, enabled: bool) {
        self.errors.store(enabled, Ordering::Relaxed);
    }
}

impl Default for ReportFlags {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================BRIDGE_SHARED
/// Both byte queues plus the report flags.
pub struct BridgeShared<const N: usize> {
    /// Transport to engine.
    pub inbound: SharedByteQueue<N>,
    /// Engine and interrupt handler to transport.
    pub outbound: SharedByteQueue<N>,
    pub flags: ReportFlags,
}

impl<const N: usize> BridgeShared<N> {
    pub const fn new() -> Self {
        Self {
            inbound: SharedByteQueue::new(),
            outbound: SharedByteQueue::new(),
            flags: ReportFlags::new(),
        }
    }

    /// Transport receive callback. Bytes that do not fit are dropped; the
    /// count actually queued is returned.
    pub fn on_transport_receive(&self, bytes: &[u8]) -> usize {
        let accepted = self.inbound.push_partial(bytes);
        if accepted < bytes.len() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Inbound queue full, dropped {} bytes", bytes.len() - accepted);
        }
        accepted
    }

    /// Sink to register with the CAN interrupt handler.
    pub fn reporter(&self) -> FrameReporter<'_, N> {
        FrameReporter { shared: self }
    }
}

impl<const N: usize> Default for BridgeShared<N> {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================FRAME_REPORTER
#[derive(Clone, Copy)]
/// Serializes received frames and bus errors into the outbound queue.
/// A record that does not fit entirely is dropped.
pub struct FrameReporter<'a, const N: usize> {
    shared: &'a BridgeShared<N>,
}

impl<const N: usize> FrameReporter<'_, N> {
    fn timestamp(&self, sample: u16) -> Option<u16> {
        self.shared.flags.timestamp().then_some(sample)
    }
}

impl<const N: usize> FrameSink for FrameReporter<'_, N> {
    fn on_frame(&mut self, frame: &CanFrame, timestamp: u16) {
        let record = encode_frame(frame, self.timestamp(timestamp));
        if !self.shared.outbound.push_all(&record) {
            #[cfg(feature = "defmt")]
            defmt::trace!("Outbound queue full, frame record dropped");
        }
    }
}

impl<const N: usize> ErrorSink for FrameReporter<'_, N> {
    fn on_bus_error(&mut self, code: LastErrorCode, timestamp: u16) {
        if !self.shared.flags.errors() {
            return;
        }
        let record = encode_error(code, self.timestamp(timestamp));
        if !self.shared.outbound.push_all(&record) {
            #[cfg(feature = "defmt")]
            defmt::trace!("Outbound queue full, error record dropped");
        }
    }
}
