//! slcan line protocol: command recognition, persisted settings, the
//! interrupt-side reporter and the main-loop engine.
pub mod command;
pub mod engine;
pub mod settings;
pub mod shared;

pub use command::Command;
pub use engine::{BridgeInterrupt, ProtocolEngine, SerialTransport, ACK, NACK};
pub use settings::{SettingChange, SettingKey, Settings, SettingsAdapter, SettingsStore};
pub use shared::{BridgeShared, FrameReporter, ReportFlags};
