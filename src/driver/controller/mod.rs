//! bxCAN controller driver.
//!
//! [`CanController`] is the main-loop half: it owns the open/closed state
//! machine, the staged bit timing, the acceptance filter and transmission.
//! [`CanInterrupt`] is the interrupt half: it drains bus errors and FIFO 0
//! into the registered sinks. Both hold their own register handle and
//! activity handle, so they can live in different execution contexts.
//!
//! Every wait on a hardware acknowledgment bit is bounded by the configured
//! spin limit and surfaces as [`DriverError::Timeout`].
use crate::driver::bit_timing::{BitTiming, Bitrate, TIMING_MASK};
use crate::driver::can_frame::CanFrame;
use crate::driver::registers::{
    btr, esr, fmr, ier, mailbox, mcr, msr, rf0r, tsr, CanRegisters, Register, FILTER_BANK0,
    TX_MAILBOXES,
};
use crate::driver::status::{BusStatus, DriverState, Filter, LastErrorCode, OpenMode};
use crate::driver::traits::{ErrorSink, FrameSink};
use crate::error::{DriverError, Handshake};
use crate::indicator::{Activity, BlinkChannel};

//==================================================================================CAN_CONTROLLER
/// Main-loop side of the driver.
pub struct CanController<R, A> {
    regs: R,
    activity: A,
    state: DriverState,
    mode: OpenMode,
    timing: BitTiming,
    filter: Filter,
    auto_retransmit_disabled: bool,
    spin_limit: u32,
}

impl<R: CanRegisters, A: Activity> CanController<R, A> {
    /// Bring the peripheral to its idle configuration: sleep mode with
    /// automatic bus-off recovery, filter bank 0 as one 32-bit mask filter on
    /// FIFO 0 accepting everything. Timing defaults to 1 Mbit/s, staged only.
    pub fn new(regs: R, activity: A, spin_limit: u32) -> Self {
        regs.modify(Register::Mcr, |v| v | mcr::SLEEP | mcr::ABOM);

        regs.modify(Register::Fmr, |v| v | fmr::FINIT);
        regs.write(Register::Fm1r, 0);
        regs.write(Register::Fs1r, FILTER_BANK0);
        regs.write(Register::Ffa1r, 0);
        regs.write(Register::Fa1r, FILTER_BANK0);
        regs.write(Register::FilterBank0Id, Filter::ACCEPT_ALL.code);
        regs.write(Register::FilterBank0Mask, !Filter::ACCEPT_ALL.mask);
        regs.modify(Register::Fmr, |v| v & !fmr::FINIT);

        Self {
            regs,
            activity,
            state: DriverState::Closed,
            mode: OpenMode::Normal,
            timing: Bitrate::Mbit1.timing(),
            filter: Filter::ACCEPT_ALL,
            auto_retransmit_disabled: false,
            spin_limit: spin_limit.max(1),
        }
    }

    /// Interrupt half sharing this controller's peripheral and indicator.
    pub fn interrupt_handler<F, E>(&self) -> CanInterrupt<R, A, F, E>
    where
        R: Clone,
        A: Clone,
        F: FrameSink,
        E: ErrorSink,
    {
        CanInterrupt::new(self.regs.clone(), self.activity.clone())
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DriverState::Open
    }

    /// Mode used by the last `open`.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Staged (or applied, when open) bit timing.
    pub fn bit_timing(&self) -> BitTiming {
        self.timing
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn auto_retransmit_disabled(&self) -> bool {
        self.auto_retransmit_disabled
    }

    fn wait_until(&self, handshake: Handshake, done: impl Fn(&R) -> bool) -> Result<(), DriverError> {
        for _ in 0..self.spin_limit {
            if done(&self.regs) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("CAN handshake timed out: {}", handshake);
        Err(DriverError::Timeout(handshake))
    }

    fn enter_initialization(&self) -> Result<(), DriverError> {
        self.regs
            .modify(Register::Mcr, |v| (v & !mcr::SLEEP) | mcr::INRQ);
        self.wait_until(Handshake::EnterInitialization, |regs| {
            let status = regs.read(Register::Msr);
            status & msr::INAK != 0 && status & msr::SLAK == 0
        })
    }

    fn leave_initialization(&self) -> Result<(), DriverError> {
        self.regs.modify(Register::Mcr, |v| v & !mcr::INRQ);
        self.wait_until(Handshake::LeaveInitialization, |regs| {
            regs.read(Register::Msr) & msr::INAK == 0
        })
    }

    fn mode_bits(&self) -> u32 {
        match self.mode {
            OpenMode::Normal => 0,
            OpenMode::LoopBack => btr::LBKM,
            OpenMode::ListenOnly => btr::SILM,
        }
    }

    fn btr_value(&self) -> u32 {
        (self.timing.to_register() & TIMING_MASK) | self.mode_bits()
    }

    /// Reset the peripheral and join the bus in `mode` with the staged timing.
    pub fn open(&mut self, mode: OpenMode) -> Result<(), DriverError> {
        self.regs.set_interrupt_line(false);
        self.regs.write(Register::Mcr, mcr::RESET);
        self.wait_until(Handshake::Reset, |regs| {
            regs.read(Register::Mcr) & mcr::RESET == 0
        })?;

        self.enter_initialization()?;

        let auto_retransmit_disabled = self.auto_retransmit_disabled;
        self.regs.modify(Register::Mcr, |v| {
            let v = v | mcr::ABOM | mcr::AWUM;
            if auto_retransmit_disabled {
                v | mcr::NART
            } else {
                v & !mcr::NART
            }
        });

        self.mode = mode;
        self.regs.write(Register::Btr, self.btr_value());

        self.leave_initialization()?;

        self.regs.write(Register::Msr, msr::ERRI);
        self.regs
            .modify(Register::Ier, |v| v | ier::FMPIE0 | ier::ERRIE | ier::LECIE);
        self.regs.set_interrupt_line(true);

        self.state = DriverState::Open;
        self.activity.link(true);

        #[cfg(feature = "defmt")]
        defmt::info!("CAN open: mode={}, timing={}", mode, self.timing);
        Ok(())
    }

    /// Put the peripheral to sleep, abort pending transmissions and mask its interrupt.
    pub fn close(&mut self) -> Result<(), DriverError> {
        self.regs
            .modify(Register::Mcr, |v| (v & !mcr::INRQ) | mcr::SLEEP);
        self.wait_until(Handshake::EnterSleep, |regs| {
            regs.read(Register::Msr) & msr::SLAK != 0
        })?;

        self.regs.write(Register::Tsr, tsr::ABRQ_ALL);
        self.regs.set_interrupt_line(false);

        self.state = DriverState::Closed;
        self.activity.link(false);

        #[cfg(feature = "defmt")]
        defmt::info!("CAN closed");
        Ok(())
    }

    /// Stage `timing`; when open, apply it right away through a short
    /// configuration-mode round trip (bus participation drops meanwhile).
    pub fn set_bit_timing(&mut self, timing: BitTiming) -> Result<(), DriverError> {
        self.timing = timing;
        if self.is_open() {
            self.enter_initialization()?;
            self.regs.write(Register::Btr, self.btr_value());
            self.leave_initialization()?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("CAN timing set: {}", timing);
        Ok(())
    }

    /// Turn automatic retransmission off (`true`) or back on. Applied at the
    /// next `open`, or immediately when already open.
    pub fn set_auto_retransmit_disabled(&mut self, disabled: bool) -> Result<(), DriverError> {
        self.auto_retransmit_disabled = disabled;
        if self.is_open() {
            self.enter_initialization()?;
            self.regs.modify(Register::Mcr, |v| {
                if disabled {
                    v | mcr::NART
                } else {
                    v & !mcr::NART
                }
            });
            self.leave_initialization()?;
        }
        Ok(())
    }

    fn with_filter_init(&self, f: impl FnOnce(&R)) {
        self.regs.modify(Register::Fmr, |v| v | fmr::FINIT);
        f(&self.regs);
        self.regs.modify(Register::Fmr, |v| v & !fmr::FINIT);
    }

    /// Acceptance code. Allowed in any state.
    pub fn set_filter_code(&mut self, code: u32) {
        self.filter.code = code;
        self.with_filter_init(|regs| regs.write(Register::FilterBank0Id, code));
    }

    /// Acceptance mask (set bits are don't-care). Allowed in any state.
    pub fn set_filter_mask(&mut self, mask: u32) {
        self.filter.mask = mask;
        self.with_filter_init(|regs| regs.write(Register::FilterBank0Mask, !mask));
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.with_filter_init(|regs| {
            regs.write(Register::FilterBank0Id, filter.code);
            regs.write(Register::FilterBank0Mask, !filter.mask);
        });
    }

    /// Place `frame` in a free mailbox and request transmission.
    /// Returns [`DriverError::Busy`] without touching the peripheral when
    /// every mailbox is occupied; retrying is up to the caller.
    pub fn transmit(&mut self, frame: &CanFrame) -> Result<(), DriverError> {
        if !self.is_open() {
            return Err(DriverError::Closed);
        }
        let status = self.regs.read(Register::Tsr);
        let Some(mb) = (0..TX_MAILBOXES).find(|&mb| status & tsr::TME[mb as usize] != 0) else {
            return Err(DriverError::Busy);
        };

        self.regs
            .write(Register::TxLengthTime(mb), frame.dlc() as u32 & mailbox::DLC_MASK);
        if !frame.is_remote() {
            let data = frame.raw_data();
            self.regs.write(
                Register::TxDataLow(mb),
                u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            );
            self.regs.write(
                Register::TxDataHigh(mb),
                u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            );
        }
        self.regs
            .write(Register::TxIdentifier(mb), identifier_word(frame) | mailbox::TXRQ);

        self.activity.blink(BlinkChannel::Tx);

        #[cfg(feature = "defmt")]
        defmt::trace!("CAN tx mailbox {}: {}", mb, frame);
        Ok(())
    }

    /// Snapshot of the slcan status flags. Reading clears the overrun flag.
    pub fn status(&mut self) -> BusStatus {
        let errors = self.regs.read(Register::Esr);
        let fifo = self.regs.read(Register::Rf0r);
        let tx = self.regs.read(Register::Tsr);

        let mut status = BusStatus::empty();
        status.set(BusStatus::RX_FIFO_FULL, fifo & rf0r::FULL0 != 0);
        status.set(BusStatus::TX_FIFO_FULL, tx & (tsr::TME0 | tsr::TME1 | tsr::TME2) == 0);
        status.set(BusStatus::ERROR_WARNING, errors & esr::EWGF != 0);
        status.set(BusStatus::DATA_OVERRUN, fifo & rf0r::FOVR0 != 0);
        status.set(BusStatus::ERROR_PASSIVE, errors & esr::EPVF != 0);
        status.set(BusStatus::ARBITRATION_LOST, tx & tsr::ALST_ANY != 0);
        status.set(BusStatus::BUS_OFF, errors & esr::BOFF != 0);

        if status.contains(BusStatus::DATA_OVERRUN) {
            self.regs.write(Register::Rf0r, rf0r::FOVR0);
        }
        status
    }
}

/// `TIxR`/`RIxR` identifier word without the request bit.
pub fn identifier_word(frame: &CanFrame) -> u32 {
    let mut word = if frame.is_extended() {
        (frame.raw_id() << mailbox::EXT_SHIFT) | mailbox::IDE
    } else {
        frame.raw_id() << mailbox::STD_SHIFT
    };
    if frame.is_remote() {
        word |= mailbox::RTR;
    }
    word
}

//==================================================================================CAN_INTERRUPT
/// Interrupt side of the driver. Sinks are registered once at startup.
pub struct CanInterrupt<R, A, F, E> {
    regs: R,
    activity: A,
    frame_sink: Option<F>,
    error_sink: Option<E>,
}

impl<R: CanRegisters, A: Activity, F: FrameSink, E: ErrorSink> CanInterrupt<R, A, F, E> {
    pub fn new(regs: R, activity: A) -> Self {
        Self {
            regs,
            activity,
            frame_sink: None,
            error_sink: None,
        }
    }

    pub fn register_frame_sink(&mut self, sink: F) {
        self.frame_sink = Some(sink);
    }

    pub fn register_error_sink(&mut self, sink: E) {
        self.error_sink = Some(sink);
    }

    /// CAN interrupt entry. Checks the error flag and the receive FIFO
    /// independently on every call; both may be pending at once.
    pub fn on_interrupt(&mut self) {
        if self.regs.read(Register::Msr) & msr::ERRI != 0 {
            self.regs.write(Register::Msr, msr::ERRI);
            let lec = (self.regs.read(Register::Esr) & esr::LEC_MASK) >> esr::LEC_SHIFT;
            let code = LastErrorCode::from_bits(lec as u8);
            if let Some(sink) = self.error_sink.as_mut() {
                sink.on_bus_error(code, self.activity.timestamp());
            }
        }

        if self.regs.read(Register::Rf0r) & rf0r::FMP0 != 0 {
            let frame = self.read_fifo();
            self.regs.write(Register::Rf0r, rf0r::RFOM0);
            self.activity.blink(BlinkChannel::Rx);
            if let (Some(frame), Some(sink)) = (frame, self.frame_sink.as_mut()) {
                sink.on_frame(&frame, self.activity.timestamp());
            }
        }
    }

    fn read_fifo(&self) -> Option<CanFrame> {
        let word = self.regs.read(Register::RxIdentifier);
        let extended = word & mailbox::IDE != 0;
        let remote = word & mailbox::RTR != 0;
        let id = if extended {
            word >> mailbox::EXT_SHIFT
        } else {
            word >> mailbox::STD_SHIFT
        };
        let dlc = ((self.regs.read(Register::RxLengthTime) & mailbox::DLC_MASK) as u8).min(8);

        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&self.regs.read(Register::RxDataLow).to_le_bytes());
        data[4..].copy_from_slice(&self.regs.read(Register::RxDataHigh).to_le_bytes());

        CanFrame::from_raw(id, extended, remote, dlc, data)
    }
}
