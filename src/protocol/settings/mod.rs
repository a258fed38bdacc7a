//! Persisted configuration and its write-through cache.
//!
//! Seven 16-bit words are stored under fixed keys: one packed mode word and
//! the low/high halves of the custom timing, the filter mask and the filter
//! code. Once a record is loaded or written the cache mirrors what storage
//! holds and unchanged values are never rewritten. Before that the cache
//! holds defaults storage may lack, so the first save writes every word.
use core::fmt::Debug;

use crate::driver::bit_timing::{BitTiming, Bitrate};
use crate::driver::controller::CanController;
use crate::driver::registers::CanRegisters;
use crate::driver::status::Filter;
use crate::error::SettingsError;
use crate::indicator::Activity;
use crate::protocol::shared::ReportFlags;

//==================================================================================STORE
/// Key/value persistence collaborator (typically wear-levelled flash).
pub trait SettingsStore {
    type Error: Debug;

    fn read(&mut self, key: u16) -> Result<u16, Self::Error>;
    fn write(&mut self, key: u16, value: u16) -> Result<(), Self::Error>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for &mut S {
    type Error = S::Error;

    fn read(&mut self, key: u16) -> Result<u16, Self::Error> {
        (**self).read(key)
    }

    fn write(&mut self, key: u16, value: u16) -> Result<(), Self::Error> {
        (**self).write(key, value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
/// Storage keys, the byte offsets of each word in the persisted record.
pub enum SettingKey {
    Mode = 0,
    CustomTimingLow = 2,
    CustomTimingHigh = 4,
    FilterMaskLow = 6,
    FilterMaskHigh = 8,
    FilterCodeLow = 10,
    FilterCodeHigh = 12,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        Self::Mode,
        Self::CustomTimingLow,
        Self::CustomTimingHigh,
        Self::FilterMaskLow,
        Self::FilterMaskHigh,
        Self::FilterCodeLow,
        Self::FilterCodeHigh,
    ];

    pub fn key(self) -> u16 {
        self as u16
    }
}

//==================================================================================SETTINGS
/// Mode word layout.
pub mod mode {
    pub const BITRATE_MASK: u16 = 0x000F;
    pub const CUSTOM: u16 = 1 << 4;
    pub const TIMESTAMP: u16 = 1 << 5;
    pub const ERROR_REPORT: u16 = 1 << 6;
    pub const AUTO_RETRANSMIT_DISABLED: u16 = 1 << 7;
    pub const VALID: u16 = 1 << 8;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Table index as stored; out-of-table values select 1 Mbit/s.
    pub bitrate: u8,
    /// Use `custom_timing` instead of the table.
    pub use_custom: bool,
    /// Raw bit-timing register value.
    pub custom_timing: u32,
    pub timestamp: bool,
    pub error_report: bool,
    pub auto_retransmit_disabled: bool,
    pub filter_code: u32,
    pub filter_mask: u32,
    /// Set with every mode-word write; cleared when loading fails.
    pub valid: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bitrate: Bitrate::Mbit1.index(),
            use_custom: false,
            custom_timing: 0,
            timestamp: false,
            error_report: false,
            auto_retransmit_disabled: false,
            filter_code: Filter::ACCEPT_ALL.code,
            filter_mask: Filter::ACCEPT_ALL.mask,
            valid: false,
        }
    }
}

impl Settings {
    pub fn mode_word(&self) -> u16 {
        let mut word = self.bitrate as u16 & mode::BITRATE_MASK;
        for (flag, bit) in [
            (self.use_custom, mode::CUSTOM),
            (self.timestamp, mode::TIMESTAMP),
            (self.error_report, mode::ERROR_REPORT),
            (self.auto_retransmit_disabled, mode::AUTO_RETRANSMIT_DISABLED),
            (self.valid, mode::VALID),
        ] {
            if flag {
                word |= bit;
            }
        }
        word
    }

    /// Overwrite the mode-word fields from `word`.
    pub fn apply_mode_word(&mut self, word: u16) {
        self.bitrate = (word & mode::BITRATE_MASK) as u8;
        self.use_custom = word & mode::CUSTOM != 0;
        self.timestamp = word & mode::TIMESTAMP != 0;
        self.error_report = word & mode::ERROR_REPORT != 0;
        self.auto_retransmit_disabled = word & mode::AUTO_RETRANSMIT_DISABLED != 0;
        self.valid = word & mode::VALID != 0;
    }

    /// Timing the stored bitrate selects.
    pub fn bit_timing(&self) -> BitTiming {
        if self.use_custom {
            BitTiming::from_register(self.custom_timing)
        } else {
            Bitrate::from_index(self.bitrate)
                .unwrap_or(Bitrate::Mbit1)
                .timing()
        }
    }

    pub fn filter(&self) -> Filter {
        Filter {
            code: self.filter_code,
            mask: self.filter_mask,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One setting changed by a protocol command.
pub enum SettingChange {
    /// Table bitrate; clears the custom selection.
    Bitrate(Bitrate),
    /// Raw timing register value; selects it over the table.
    CustomTiming(u32),
    Timestamp(bool),
    ErrorReport(bool),
    AutoRetransmitDisabled(bool),
    FilterCode(u32),
    FilterMask(u32),
}

//==================================================================================ADAPTER
/// Owner of the store and of the cached [`Settings`].
pub struct SettingsAdapter<S> {
    store: S,
    settings: Settings,
}

impl<S: SettingsStore> SettingsAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            settings: Settings::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn read(&mut self, key: SettingKey) -> Result<u16, SettingsError<S::Error>> {
        self.store.read(key.key()).map_err(|reason| SettingsError::Read {
            key: key.key(),
            reason,
        })
    }

    fn write(&mut self, key: SettingKey, value: u16) -> Result<(), SettingsError<S::Error>> {
        self.store
            .write(key.key(), value)
            .map_err(|reason| SettingsError::Write {
                key: key.key(),
                reason,
            })
    }

    fn read_pair(&mut self, low: SettingKey, high: SettingKey) -> Result<u32, SettingsError<S::Error>> {
        let low = self.read(low)? as u32;
        let high = self.read(high)? as u32;
        Ok((high << 16) | low)
    }

    /// Read every word. Any failure leaves the cache at defaults, marked
    /// invalid, and nothing is applied.
    pub fn load(&mut self) -> Result<&Settings, SettingsError<S::Error>> {
        match self.read_all() {
            Ok(settings) => {
                self.settings = settings;
                Ok(&self.settings)
            }
            Err(error) => {
                self.settings = Settings::default();
                #[cfg(feature = "defmt")]
                defmt::warn!("Stored settings unreadable, keeping defaults");
                Err(error)
            }
        }
    }

    fn read_all(&mut self) -> Result<Settings, SettingsError<S::Error>> {
        let mut settings = Settings::default();
        settings.apply_mode_word(self.read(SettingKey::Mode)?);
        settings.custom_timing = self.read_pair(SettingKey::CustomTimingLow, SettingKey::CustomTimingHigh)?;
        settings.filter_mask = self.read_pair(SettingKey::FilterMaskLow, SettingKey::FilterMaskHigh)?;
        settings.filter_code = self.read_pair(SettingKey::FilterCodeLow, SettingKey::FilterCodeHigh)?;
        Ok(settings)
    }

    /// [`load`](Self::load), then push the result into the driver and the
    /// report flags: bitrate, timestamp, auto-retransmit, filter code, filter mask.
    pub fn load_into<R: CanRegisters, A: Activity>(
        &mut self,
        controller: &mut CanController<R, A>,
        flags: &ReportFlags,
    ) -> Result<(), SettingsError<S::Error>> {
        let settings = *self.load()?;

        controller.set_bit_timing(settings.bit_timing())?;
        flags.set_timestamp(settings.timestamp);
        flags.set_errors(settings.error_report);
        controller.set_auto_retransmit_disabled(settings.auto_retransmit_disabled)?;
        controller.set_filter_code(settings.filter_code);
        controller.set_filter_mask(settings.filter_mask);

        #[cfg(feature = "defmt")]
        defmt::info!("Settings restored: {}", settings);
        Ok(())
    }

    /// Record `change` and write through the words whose value differs from
    /// the cache. While the record is invalid every word is written, mode
    /// word last; any mode-word write marks the record valid.
    /// Returns whether storage was touched.
    pub fn save_if_changed(&mut self, change: SettingChange) -> Result<bool, SettingsError<S::Error>> {
        let mut next = self.settings;
        match change {
            SettingChange::Bitrate(bitrate) => {
                next.bitrate = bitrate.index();
                next.use_custom = false;
            }
            SettingChange::CustomTiming(raw) => {
                next.custom_timing = raw;
                next.use_custom = true;
            }
            SettingChange::Timestamp(enabled) => next.timestamp = enabled,
            SettingChange::ErrorReport(enabled) => next.error_report = enabled,
            SettingChange::AutoRetransmitDisabled(disabled) => next.auto_retransmit_disabled = disabled,
            SettingChange::FilterCode(code) => next.filter_code = code,
            SettingChange::FilterMask(mask) => next.filter_mask = mask,
        }

        let full = !self.settings.valid;
        let mut written = false;

        if full || next.custom_timing != self.settings.custom_timing {
            self.write_pair(SettingKey::CustomTimingLow, SettingKey::CustomTimingHigh, next.custom_timing)?;
            self.settings.custom_timing = next.custom_timing;
            written = true;
        }
        if full || next.filter_mask != self.settings.filter_mask {
            self.write_pair(SettingKey::FilterMaskLow, SettingKey::FilterMaskHigh, next.filter_mask)?;
            self.settings.filter_mask = next.filter_mask;
            written = true;
        }
        if full || next.filter_code != self.settings.filter_code {
            self.write_pair(SettingKey::FilterCodeLow, SettingKey::FilterCodeHigh, next.filter_code)?;
            self.settings.filter_code = next.filter_code;
            written = true;
        }

        if full || next.mode_word() != self.settings.mode_word() {
            next.valid = true;
            self.write(SettingKey::Mode, next.mode_word())?;
            self.settings.apply_mode_word(next.mode_word());
            written = true;
        }

        if full {
            #[cfg(feature = "defmt")]
            defmt::info!("Settings record initialized");
        }
        Ok(written)
    }

    fn write_pair(&mut self, low: SettingKey, high: SettingKey, value: u32) -> Result<(), SettingsError<S::Error>> {
        self.write(low, value as u16)?;
        self.write(high, (value >> 16) as u16)
    }
}
