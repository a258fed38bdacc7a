//! Test doubles standing in for the peripherals and collaborators around the
//! bridge core: bxCAN register file, settings storage, compare timer, LED
//! pins and the serial transport.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, OutputPin};
use slcan_bridge::driver::controller::identifier_word;
use slcan_bridge::driver::registers::{
    btr, esr, mailbox, mcr, msr, rf0r, tsr, CanRegisters, Register, TX_MAILBOXES,
};
use slcan_bridge::driver::CanFrame;
use slcan_bridge::error::Handshake;
use slcan_bridge::indicator::{BlinkChannel, CompareTimer};
use slcan_bridge::protocol::{SerialTransport, SettingsStore};

/// Depth of the simulated receive FIFO.
pub const FIFO_DEPTH: usize = 3;

//==================================================================================SIMULATED_CAN
/// bxCAN register file. Mode requests are acknowledged immediately unless a
/// handshake is jammed; transmissions complete at once unless mailboxes are held.
pub struct SimulatedCan {
    regs: RefCell<HashMap<Register, u32>>,
    writes: RefCell<Vec<(Register, u32)>>,
    fifo: RefCell<VecDeque<CanFrame>>,
    transmitted: RefCell<Vec<CanFrame>>,
    interrupt_line: Cell<bool>,
    jammed: Cell<Option<Handshake>>,
    hold_mailboxes: Cell<bool>,
}

impl SimulatedCan {
    pub fn new() -> Self {
        let can = Self {
            regs: RefCell::new(HashMap::new()),
            writes: RefCell::new(Vec::new()),
            fifo: RefCell::new(VecDeque::new()),
            transmitted: RefCell::new(Vec::new()),
            interrupt_line: Cell::new(false),
            jammed: Cell::new(None),
            hold_mailboxes: Cell::new(false),
        };
        can.reset();
        can
    }

    /// Power-on values: sleeping, all mailboxes empty.
    fn reset(&self) {
        let mut regs = self.regs.borrow_mut();
        regs.insert(Register::Mcr, mcr::SLEEP);
        regs.insert(Register::Msr, msr::SLAK);
        regs.insert(Register::Tsr, tsr::TME0 | tsr::TME1 | tsr::TME2);
        regs.insert(Register::Esr, 0);
        regs.insert(Register::Btr, 0);
        regs.insert(Register::Ier, 0);
    }

    pub fn reg(&self, reg: Register) -> u32 {
        self.regs.borrow().get(&reg).copied().unwrap_or(0)
    }

    /// Force a register value without going through write side effects.
    pub fn set_reg(&self, reg: Register, value: u32) {
        self.regs.borrow_mut().insert(reg, value);
    }

    pub fn writes(&self) -> Vec<(Register, u32)> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    pub fn transmitted(&self) -> Vec<CanFrame> {
        self.transmitted.borrow().clone()
    }

    pub fn interrupt_line(&self) -> bool {
        self.interrupt_line.get()
    }

    /// Make the given acknowledgment never arrive.
    pub fn jam(&self, handshake: Option<Handshake>) {
        self.jammed.set(handshake);
    }

    /// Keep transmitted frames pending so their mailboxes stay occupied.
    pub fn hold_mailboxes(&self, hold: bool) {
        self.hold_mailboxes.set(hold);
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.borrow().len()
    }

    /// A frame arrives from the bus. Returns whether the hardware filter
    /// accepted it into FIFO 0.
    pub fn deliver(&self, frame: CanFrame) -> bool {
        let word = identifier_word(&frame);
        let code = self.reg(Register::FilterBank0Id);
        let must_match = self.reg(Register::FilterBank0Mask);
        if (word ^ code) & must_match != 0 {
            return false;
        }

        let mut fifo = self.fifo.borrow_mut();
        if fifo.len() == FIFO_DEPTH {
            drop(fifo);
            self.set_reg(Register::Rf0r, self.reg(Register::Rf0r) | rf0r::FOVR0);
            return false;
        }
        fifo.push_back(frame);
        true
    }

    /// The peripheral flags a bus error with the given last error code.
    pub fn raise_error(&self, lec: u8) {
        let esr = (self.reg(Register::Esr) & !esr::LEC_MASK) | ((lec as u32) << esr::LEC_SHIFT);
        self.set_reg(Register::Esr, esr);
        self.set_reg(Register::Msr, self.reg(Register::Msr) | msr::ERRI);
    }

    fn jammed(&self, handshake: Handshake) -> bool {
        self.jammed.get() == Some(handshake)
    }

    fn write_mcr(&self, value: u32) {
        if value & mcr::RESET != 0 {
            self.reset();
            if self.jammed(Handshake::Reset) {
                self.set_reg(Register::Mcr, mcr::SLEEP | mcr::RESET);
            }
            return;
        }
        self.set_reg(Register::Mcr, value);

        let mut status = self.reg(Register::Msr) & msr::ERRI;
        let init = value & mcr::INRQ != 0;
        let sleep = value & mcr::SLEEP != 0 && !init;
        let inak = if init {
            !self.jammed(Handshake::EnterInitialization)
        } else {
            self.jammed(Handshake::LeaveInitialization)
        };
        let slak = sleep && !self.jammed(Handshake::EnterSleep);
        if inak {
            status |= msr::INAK;
        }
        if slak {
            status |= msr::SLAK;
        }
        self.set_reg(Register::Msr, status);
    }

    fn request_transmission(&self, mb: u8, word: u32) {
        let extended = word & mailbox::IDE != 0;
        let remote = word & mailbox::RTR != 0;
        let id = if extended {
            word >> mailbox::EXT_SHIFT
        } else {
            word >> mailbox::STD_SHIFT
        };
        let dlc = (self.reg(Register::TxLengthTime(mb)) & mailbox::DLC_MASK) as u8;
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&self.reg(Register::TxDataLow(mb)).to_le_bytes());
        data[4..].copy_from_slice(&self.reg(Register::TxDataHigh(mb)).to_le_bytes());

        let frame = CanFrame::from_raw(id, extended, remote, dlc, data).expect("valid mailbox contents");
        self.transmitted.borrow_mut().push(frame);
        self.set_reg(Register::TxIdentifier(mb), word & !mailbox::TXRQ);

        if self.hold_mailboxes.get() {
            self.set_reg(Register::Tsr, self.reg(Register::Tsr) & !tsr::TME[mb as usize]);
        }
        if self.reg(Register::Btr) & btr::LBKM != 0 {
            self.deliver(frame);
        }
    }
}

impl Default for SimulatedCan {
    fn default() -> Self {
        Self::new()
    }
}

impl CanRegisters for SimulatedCan {
    fn read(&self, reg: Register) -> u32 {
        let fifo = self.fifo.borrow();
        let head = fifo.front();
        match reg {
            Register::Rf0r => {
                let flags = self.reg(Register::Rf0r) & rf0r::FOVR0;
                let full = if fifo.len() == FIFO_DEPTH { rf0r::FULL0 } else { 0 };
                flags | full | fifo.len() as u32
            }
            Register::RxIdentifier => head.map(identifier_word).unwrap_or(0),
            Register::RxLengthTime => head.map(|f| f.dlc() as u32).unwrap_or(0),
            Register::RxDataLow | Register::RxDataHigh => {
                let mut data = [0u8; 8];
                if let Some(frame) = head {
                    data[..frame.data().len()].copy_from_slice(frame.data());
                }
                let half = if reg == Register::RxDataLow { 0 } else { 4 };
                u32::from_le_bytes([data[half], data[half + 1], data[half + 2], data[half + 3]])
            }
            other => self.reg(other),
        }
    }

    fn write(&self, reg: Register, value: u32) {
        self.writes.borrow_mut().push((reg, value));
        match reg {
            Register::Mcr => self.write_mcr(value),
            Register::Msr => {
                let cleared = value & msr::ERRI;
                self.set_reg(Register::Msr, self.reg(Register::Msr) & !cleared);
            }
            Register::Rf0r => {
                if value & rf0r::FOVR0 != 0 {
                    self.set_reg(Register::Rf0r, self.reg(Register::Rf0r) & !rf0r::FOVR0);
                }
                if value & rf0r::RFOM0 != 0 {
                    self.fifo.borrow_mut().pop_front();
                }
            }
            Register::Tsr => {
                if value & tsr::ABRQ_ALL != 0 {
                    let mut status = self.reg(Register::Tsr);
                    for mb in 0..TX_MAILBOXES as usize {
                        status |= tsr::TME[mb];
                    }
                    self.set_reg(Register::Tsr, status);
                }
            }
            Register::TxIdentifier(mb) => {
                self.set_reg(reg, value);
                if value & mailbox::TXRQ != 0 {
                    self.request_transmission(mb, value);
                }
            }
            other => self.set_reg(other, value),
        }
    }

    fn set_interrupt_line(&self, enabled: bool) {
        self.interrupt_line.set(enabled);
    }
}

//==================================================================================MEMORY_STORE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    Missing,
    Injected,
}

#[derive(Default)]
/// Settings storage held in a map, with per-key read faults and a global
/// write fault.
pub struct MemoryStore {
    pub words: HashMap<u16, u16>,
    pub writes: Vec<(u16, u16)>,
    pub failing_reads: HashSet<u16>,
    pub failing_writes: bool,
}

impl MemoryStore {
    pub fn with_words(words: &[(u16, u16)]) -> Self {
        Self {
            words: words.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl SettingsStore for MemoryStore {
    type Error = StoreFault;

    fn read(&mut self, key: u16) -> Result<u16, Self::Error> {
        if self.failing_reads.contains(&key) {
            return Err(StoreFault::Injected);
        }
        self.words.get(&key).copied().ok_or(StoreFault::Missing)
    }

    fn write(&mut self, key: u16, value: u16) -> Result<(), Self::Error> {
        if self.failing_writes {
            return Err(StoreFault::Injected);
        }
        self.words.insert(key, value);
        self.writes.push((key, value));
        Ok(())
    }
}

//==================================================================================FAKE_TIMER
#[derive(Clone)]
/// Compare timer whose counter is advanced by the test through a shared clock.
pub struct FakeTimer {
    clock: Arc<AtomicU32>,
    period: u32,
    armed: [Option<u32>; 2],
    matched: [bool; 2],
}

impl FakeTimer {
    pub fn new(period: u32) -> (Self, Arc<AtomicU32>) {
        let clock = Arc::new(AtomicU32::new(0));
        let timer = Self {
            clock: clock.clone(),
            period,
            armed: [None; 2],
            matched: [false; 2],
        };
        (timer, clock)
    }

    fn slot(channel: BlinkChannel) -> usize {
        match channel {
            BlinkChannel::Rx => 0,
            BlinkChannel::Tx => 1,
        }
    }

    /// Latch compare matches reached at the current count.
    pub fn sample(&mut self) {
        let now = self.count();
        for slot in 0..2 {
            if self.armed[slot] == Some(now) {
                self.matched[slot] = true;
            }
        }
    }
}

impl CompareTimer for FakeTimer {
    fn count(&self) -> u32 {
        self.clock.load(Ordering::SeqCst) % self.period
    }

    fn period(&self) -> u32 {
        self.period
    }

    fn arm(&mut self, channel: BlinkChannel, target: u32) {
        let slot = Self::slot(channel);
        self.armed[slot] = Some(target);
        self.matched[slot] = false;
    }

    fn disarm(&mut self, channel: BlinkChannel) {
        self.armed[Self::slot(channel)] = None;
    }

    fn take_match(&mut self, channel: BlinkChannel) -> bool {
        self.sample();
        let slot = Self::slot(channel);
        std::mem::take(&mut self.matched[slot])
    }
}

//==================================================================================RECORDING_PIN
#[derive(Clone, Default)]
/// Output pin whose level the test can observe through a shared handle.
pub struct RecordingPin {
    level: Arc<AtomicBool>,
}

impl RecordingPin {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let pin = Self::default();
        let level = pin.level.clone();
        (pin, level)
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.store(true, Ordering::SeqCst);
        Ok(())
    }
}

//==================================================================================RECORDING_TRANSPORT
#[derive(Default)]
/// Serial endpoint that records everything written, optionally accepting at
/// most `budget` bytes per call.
pub struct RecordingTransport {
    pub received: Vec<u8>,
    pub budget: Option<usize>,
}

impl RecordingTransport {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            received: Vec::new(),
            budget: Some(budget),
        }
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.received)
    }
}

impl SerialTransport for RecordingTransport {
    fn write(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.budget.map_or(bytes.len(), |budget| budget.min(bytes.len()));
        self.received.extend_from_slice(&bytes[..accepted]);
        accepted
    }
}
