//! Boot-time configuration of the bridge: reported versions, help banner,
//! activity blink length and handshake bounds.

/// Capacity of each inbound/outbound byte queue.
pub const QUEUE_CAPACITY: usize = 4096;

/// Activity timer tick rate (Hz). One tick is one millisecond.
pub const TIMER_TICK_HZ: u32 = 1_000;

/// Activity timer period in ticks. Timestamps wrap at this value.
pub const TIMER_PERIOD_TICKS: u32 = 60_000;

/// Default blink hold for the RX/TX indicators, in timer ticks.
pub const DEFAULT_BLINK_TICKS: u32 = 5;

/// Default number of polls before a peripheral handshake is declared lost.
pub const DEFAULT_HANDSHAKE_SPIN_LIMIT: u32 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Parameters fixed at startup and shared by the driver and the protocol engine.
pub struct BridgeConfig {
    /// Reported by `v` (prefixed with `v`).
    pub sw_version: &'static str,
    /// Reported by `V` (prefixed with `V`).
    pub hw_version: &'static str,
    /// First line of the help text.
    pub banner: &'static str,
    /// RX/TX indicator hold time in timer ticks.
    pub blink_ticks: u32,
    /// Upper bound on acknowledgment polls for every peripheral mode change.
    pub handshake_spin_limit: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sw_version: "STM32",
            hw_version: "0112",
            banner: "USB-CAN adapter based on STM32F072.",
            blink_ticks: DEFAULT_BLINK_TICKS,
            handshake_spin_limit: DEFAULT_HANDSHAKE_SPIN_LIMIT,
        }
    }
}

impl BridgeConfig {
    /// Override the blink hold time.
    pub fn with_blink_ticks(mut self, ticks: u32) -> Self {
        self.blink_ticks = ticks;
        self
    }

    /// Override the handshake spin limit. Zero is raised to one poll.
    pub fn with_handshake_spin_limit(mut self, limit: u32) -> Self {
        self.handshake_spin_limit = limit.max(1);
        self
    }
}
