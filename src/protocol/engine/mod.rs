//! Main-loop command processor.
//!
//! [`ProtocolEngine::poll`] takes one command byte from the inbound queue,
//! busy-waits for its argument bytes, drives the controller and appends the
//! reply to the outbound queue. [`ProtocolEngine::flush`] hands queued output
//! to the transport.
//!
//! Replies: `\r` on success, BEL on failure, `z`/`Z` echoed before the ack
//! of a transmitted frame. Help prints text and no ack. Bytes that are not
//! commands (including stray terminators) produce nothing.
pub mod help;

use core::fmt::Write;

use crate::config::BridgeConfig;
use crate::driver::bit_timing::{BitTiming, Bitrate};
use crate::driver::can_frame::CanFrame;
use crate::driver::controller::{CanController, CanInterrupt};
use crate::driver::registers::CanRegisters;
use crate::driver::status::OpenMode;
use crate::error::{CommandError, ParseError, SettingsError};
use crate::indicator::Activity;
use crate::infra::codec::frame::{FrameDecoder, FrameKind, TERMINATOR};
use crate::infra::codec::hex::{hex_value, write_hex};
use crate::protocol::command::Command;
use crate::protocol::settings::{SettingChange, Settings, SettingsAdapter, SettingsStore};
use crate::protocol::shared::{BridgeShared, FrameReporter};

use help::{write_help, QueueWriter};

/// Success acknowledgment.
pub const ACK: u8 = b'\r';
/// Failure acknowledgment (BEL).
pub const NACK: u8 = 0x07;

/// Bytes handed to the transport per write attempt.
const FLUSH_CHUNK: usize = 64;

/// Serial side of the bridge (USB CDC endpoint in the firmware).
pub trait SerialTransport {
    /// Offer `bytes`; returns how many leading bytes were accepted.
    fn write(&mut self, bytes: &[u8]) -> usize;
}

impl<T: SerialTransport + ?Sized> SerialTransport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> usize {
        (**self).write(bytes)
    }
}

/// Interrupt handler reporting into the engine's shared queues.
pub type BridgeInterrupt<'a, R, A, const N: usize> =
    CanInterrupt<R, A, FrameReporter<'a, N>, FrameReporter<'a, N>>;

//==================================================================================PROTOCOL_ENGINE
pub struct ProtocolEngine<'a, R, A, S, const N: usize> {
    config: BridgeConfig,
    shared: &'a BridgeShared<N>,
    controller: CanController<R, A>,
    settings: SettingsAdapter<S>,
    last_byte: u8,
}

impl<'a, R, A, S, const N: usize> ProtocolEngine<'a, R, A, S, N>
where
    R: CanRegisters,
    A: Activity,
    S: SettingsStore,
{
    /// Initialize the controller (closed, accept-all filter) and wrap it.
    /// Call [`start`](Self::start) afterwards to restore stored settings.
    pub fn new(config: BridgeConfig, shared: &'a BridgeShared<N>, regs: R, activity: A, store: S) -> Self {
        Self {
            controller: CanController::new(regs, activity, config.handshake_spin_limit),
            settings: SettingsAdapter::new(store),
            config,
            shared,
            last_byte: 0,
        }
    }

    /// Restore persisted settings into the controller and the report flags.
    /// On failure everything stays at its defaults and the settings are
    /// marked invalid.
    pub fn start(&mut self) -> Result<(), SettingsError<S::Error>> {
        self.settings
            .load_into(&mut self.controller, &self.shared.flags)
    }

    /// Interrupt half wired to this engine's outbound queue.
    pub fn interrupt_handler(&self) -> BridgeInterrupt<'a, R, A, N>
    where
        R: Clone,
        A: Clone,
    {
        let mut handler = self.controller.interrupt_handler();
        handler.register_frame_sink(self.shared.reporter());
        handler.register_error_sink(self.shared.reporter());
        handler
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn shared(&self) -> &'a BridgeShared<N> {
        self.shared
    }

    pub fn controller(&self) -> &CanController<R, A> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CanController<R, A> {
        &mut self.controller
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    pub fn settings_adapter(&self) -> &SettingsAdapter<S> {
        &self.settings
    }

    /// Process one command if a byte is waiting. Returns whether a byte was consumed.
    pub fn poll(&mut self) -> bool {
        let Some(byte) = self.shared.inbound.pop() else {
            return false;
        };
        self.last_byte = byte;

        let Some(command) = Command::from_byte(byte) else {
            #[cfg(feature = "defmt")]
            defmt::trace!("Ignoring byte {=u8:#04x}", byte);
            return true;
        };

        let result = self.execute(command);
        if command.is_acknowledged() {
            self.acknowledge(result);
        }
        true
    }

    /// Move queued output to `transport`, removing only what it accepted.
    /// Returns the number of bytes written.
    pub fn flush<T: SerialTransport>(&self, transport: &mut T) -> usize {
        let mut chunk = [0u8; FLUSH_CHUNK];
        let mut written = 0;
        loop {
            let pending = self.shared.outbound.peek_into(&mut chunk);
            if pending == 0 {
                break;
            }
            let accepted = transport.write(&chunk[..pending]).min(pending);
            self.shared.outbound.discard(accepted);
            written += accepted;
            if accepted < pending {
                break;
            }
        }
        written
    }

    /// One main-loop iteration: at most one command, then a flush.
    pub fn run_once<T: SerialTransport>(&mut self, transport: &mut T) -> bool {
        let processed = self.poll();
        self.flush(transport);
        processed
    }

    //==============================================================================COMMANDS
    fn execute(&mut self, command: Command) -> Result<(), CommandError> {
        match command {
            Command::SoftwareVersion => {
                self.respond_text('v', self.config.sw_version);
            }
            Command::HardwareVersion => {
                self.respond_text('V', self.config.hw_version);
            }
            Command::Status => {
                let status = self.controller.status();
                let mut reply = [b'F', 0, 0];
                write_hex(status.bits() as u32, &mut reply[1..]);
                self.respond(&reply);
            }
            Command::Open(mode) => {
                if mode == OpenMode::Normal {
                    self.shared.outbound.clear();
                }
                self.controller.open(mode)?;
            }
            Command::Close => self.controller.close()?,
            Command::SetBitrate => {
                let byte = self.next_byte();
                let bitrate = (byte as char)
                    .to_digit(10)
                    .and_then(|index| Bitrate::from_index(index as u8))
                    .ok_or(ParseError::InvalidArgument { byte })?;
                self.controller.set_bit_timing(bitrate.timing())?;
                self.persist(SettingChange::Bitrate(bitrate));
            }
            Command::SetCustomTiming => {
                let value = self.read_hex_field(4)?;
                let timing = BitTiming::from_slcan_custom(value as u16);
                self.controller.set_bit_timing(timing)?;
                self.persist(SettingChange::CustomTiming(timing.to_register()));
            }
            Command::SetTimestamp => {
                let enabled = self.read_switch()?;
                self.shared.flags.set_timestamp(enabled);
                self.persist(SettingChange::Timestamp(enabled));
            }
            Command::SetErrorReport => {
                let enabled = self.read_switch()?;
                self.shared.flags.set_errors(enabled);
                self.persist(SettingChange::ErrorReport(enabled));
            }
            Command::SetAutoRetransmitDisabled => {
                let disabled = self.read_switch()?;
                self.controller.set_auto_retransmit_disabled(disabled)?;
                self.persist(SettingChange::AutoRetransmitDisabled(disabled));
            }
            Command::Send(kind) => {
                let frame = self.read_frame(kind)?;
                self.controller.transmit(&frame)?;
                self.respond(if kind.extended { b"Z" } else { b"z" });
            }
            Command::SetFilterCode => {
                let code = self.read_hex_field(8)?;
                self.controller.set_filter_code(code);
                self.persist(SettingChange::FilterCode(code));
            }
            Command::SetFilterMask => {
                let mask = self.read_hex_field(8)?;
                self.controller.set_filter_mask(mask);
                self.persist(SettingChange::FilterMask(mask));
            }
            Command::Help => {
                let mut out = QueueWriter::new(&self.shared.outbound);
                if write_help(&mut out, &self.config, self.settings.settings()).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Outbound queue full, help text truncated");
                }
            }
        }
        Ok(())
    }

    fn acknowledge(&mut self, result: Result<(), CommandError>) {
        match result {
            Ok(()) => self.respond(&[ACK]),
            Err(error) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Command rejected: {}", error);
                if matches!(error, CommandError::Parse(_)) && self.last_byte != TERMINATOR {
                    self.skip_line();
                }
                self.respond(&[NACK]);
            }
        }
    }

    /// Write-through of a changed setting. Storage failures do not affect the reply.
    fn persist(&mut self, change: SettingChange) {
        if self.settings.save_if_changed(change).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Persisting {} failed", change);
        }
    }

    //==============================================================================OUTPUT
    fn respond(&self, bytes: &[u8]) {
        if !self.shared.outbound.push_all(bytes) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Outbound queue full, reply dropped");
        }
    }

    fn respond_text(&self, prefix: char, text: &str) {
        let mut out = QueueWriter::new(&self.shared.outbound);
        if write!(out, "{prefix}{text}").is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Outbound queue full, reply truncated");
        }
    }

    //==============================================================================INPUT
    /// Argument bytes follow their command within the same transfer; wait for them.
    fn next_byte(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.shared.inbound.pop() {
                self.last_byte = byte;
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    /// Drop the rest of a malformed command, terminator included.
    fn skip_line(&mut self) {
        while self.next_byte() != TERMINATOR {}
    }

    fn read_switch(&mut self) -> Result<bool, ParseError> {
        match self.next_byte() {
            b'0' => Ok(false),
            b'1' => Ok(true),
            byte => Err(ParseError::InvalidArgument { byte }),
        }
    }

    /// Up to `max_digits` hex digits; an earlier terminator ends the field
    /// (and is consumed), provided at least one digit came first.
    fn read_hex_field(&mut self, max_digits: usize) -> Result<u32, ParseError> {
        let mut value = 0u32;
        for position in 1..=max_digits {
            let byte = self.next_byte();
            if byte == TERMINATOR {
                if position == 1 {
                    return Err(ParseError::UnexpectedTerminator { position });
                }
                break;
            }
            let nibble = hex_value(byte).ok_or(ParseError::InvalidHexDigit { byte })?;
            value = (value << 4) | nibble as u32;
        }
        Ok(value)
    }

    /// Frame fields up to the DLC-given length. Anything between the last
    /// field and the terminator is dropped.
    fn read_frame(&mut self, kind: FrameKind) -> Result<CanFrame, ParseError> {
        let mut decoder = FrameDecoder::new(kind);
        let frame = loop {
            let byte = self.next_byte();
            if let Some(frame) = decoder.feed(byte)? {
                break frame;
            }
        };
        if self.next_byte() != TERMINATOR {
            #[cfg(feature = "defmt")]
            defmt::debug!("Dropping bytes past the frame fields");
            self.skip_line();
        }
        Ok(frame)
    }
}
