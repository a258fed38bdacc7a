//! Register-level seam to the bxCAN peripheral.
//!
//! The driver never dereferences peripheral memory itself; it goes through
//! [`CanRegisters`], which a board crate implements on top of its PAC (volatile
//! accesses on the `CAN` register block plus the NVIC line) and which tests
//! implement with a simulated register file.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Registers of the bxCAN block touched by the driver.
pub enum Register {
    /// Master control.
    Mcr,
    /// Master status.
    Msr,
    /// Transmit status.
    Tsr,
    /// Receive FIFO 0 status.
    Rf0r,
    /// Interrupt enable.
    Ier,
    /// Error status.
    Esr,
    /// Bit timing (also carries loopback/silent mode bits).
    Btr,
    /// Filter master.
    Fmr,
    /// Filter mode (mask vs list).
    Fm1r,
    /// Filter scale (16 vs 32 bit).
    Fs1r,
    /// Filter FIFO assignment.
    Ffa1r,
    /// Filter activation.
    Fa1r,
    /// Filter bank 0, identifier register.
    FilterBank0Id,
    /// Filter bank 0, mask register.
    FilterBank0Mask,
    /// Transmit mailbox identifier (`TIxR`).
    TxIdentifier(u8),
    /// Transmit mailbox length/time (`TDTxR`).
    TxLengthTime(u8),
    /// Transmit mailbox data low word (`TDLxR`).
    TxDataLow(u8),
    /// Transmit mailbox data high word (`TDHxR`).
    TxDataHigh(u8),
    /// FIFO 0 output mailbox identifier (`RI0R`).
    RxIdentifier,
    /// FIFO 0 output mailbox length/time (`RDT0R`).
    RxLengthTime,
    /// FIFO 0 output mailbox data low word (`RDL0R`).
    RxDataLow,
    /// FIFO 0 output mailbox data high word (`RDH0R`).
    RxDataHigh,
}

/// Volatile access to the CAN peripheral. All methods take `&self`: the main
/// loop and the interrupt handler each hold their own handle to the same block.
pub trait CanRegisters {
    fn read(&self, reg: Register) -> u32;
    fn write(&self, reg: Register, value: u32);

    /// Read-modify-write.
    fn modify(&self, reg: Register, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Enable or mask the CAN interrupt line at the interrupt controller.
    fn set_interrupt_line(&self, enabled: bool);
}

impl<T: CanRegisters + ?Sized> CanRegisters for &T {
    fn read(&self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }

    fn set_interrupt_line(&self, enabled: bool) {
        (**self).set_interrupt_line(enabled)
    }
}

/// Number of transmit mailboxes.
pub const TX_MAILBOXES: u8 = 3;

//==================================================================================MCR
pub mod mcr {
    pub const INRQ: u32 = 1 << 0;
    pub const SLEEP: u32 = 1 << 1;
    pub const NART: u32 = 1 << 4;
    pub const AWUM: u32 = 1 << 5;
    pub const ABOM: u32 = 1 << 6;
    pub const RESET: u32 = 1 << 15;
}

//==================================================================================MSR
pub mod msr {
    pub const INAK: u32 = 1 << 0;
    pub const SLAK: u32 = 1 << 1;
    /// Error interrupt flag, cleared by writing 1.
    pub const ERRI: u32 = 1 << 2;
}

//==================================================================================TSR
pub mod tsr {
    pub const ALST0: u32 = 1 << 2;
    pub const ABRQ0: u32 = 1 << 7;
    pub const ALST1: u32 = 1 << 10;
    pub const ABRQ1: u32 = 1 << 15;
    pub const ALST2: u32 = 1 << 18;
    pub const ABRQ2: u32 = 1 << 23;
    pub const TME0: u32 = 1 << 26;
    pub const TME1: u32 = 1 << 27;
    pub const TME2: u32 = 1 << 28;
    pub const TME: [u32; 3] = [TME0, TME1, TME2];
    pub const ABRQ_ALL: u32 = ABRQ0 | ABRQ1 | ABRQ2;
    pub const ALST_ANY: u32 = ALST0 | ALST1 | ALST2;
}

//==================================================================================RF0R
pub mod rf0r {
    /// Pending message count (2 bits).
    pub const FMP0: u32 = 0b11;
    pub const FULL0: u32 = 1 << 3;
    /// Overrun flag, cleared by writing 1.
    pub const FOVR0: u32 = 1 << 4;
    /// Release the output mailbox.
    pub const RFOM0: u32 = 1 << 5;
}

//==================================================================================IER
pub mod ier {
    pub const FMPIE0: u32 = 1 << 1;
    pub const LECIE: u32 = 1 << 11;
    pub const ERRIE: u32 = 1 << 15;
}

//==================================================================================ESR
pub mod esr {
    pub const EWGF: u32 = 1 << 0;
    pub const EPVF: u32 = 1 << 1;
    pub const BOFF: u32 = 1 << 2;
    pub const LEC_SHIFT: u32 = 4;
    pub const LEC_MASK: u32 = 0b111 << LEC_SHIFT;
}

//==================================================================================BTR
pub mod btr {
    pub const LBKM: u32 = 1 << 30;
    pub const SILM: u32 = 1 << 31;
}

//==================================================================================FILTERS
pub mod fmr {
    pub const FINIT: u32 = 1 << 0;
}

/// Bank 0 bit in the per-bank filter registers.
pub const FILTER_BANK0: u32 = 1 << 0;

//==================================================================================MAILBOX
pub mod mailbox {
    pub const TXRQ: u32 = 1 << 0;
    pub const RTR: u32 = 1 << 1;
    pub const IDE: u32 = 1 << 2;
    pub const STD_SHIFT: u32 = 21;
    pub const EXT_SHIFT: u32 = 3;
    pub const DLC_MASK: u32 = 0xF;
}
