//! Bit timing descriptors for the bxCAN `BTR` register and the nine
//! canonical slcan bitrates (48 MHz peripheral clock, 16 or 12 quanta per bit).

/// `BTR` bits owned by the timing fields (SJW, TS2, TS1, BRP).
pub const TIMING_MASK: u32 = 0x037F_03FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Synchronization jump width, time segments and prescaler, stored as their
/// real (1-based) values.
pub struct BitTiming {
    sjw: u8,
    ts1: u8,
    ts2: u8,
    brp: u16,
}

impl BitTiming {
    /// Validated constructor: SJW 1–4, TS1 1–16, TS2 1–8, BRP 1–1024.
    pub const fn new(sjw: u8, ts1: u8, ts2: u8, brp: u16) -> Option<Self> {
        if sjw < 1 || sjw > 4 || ts1 < 1 || ts1 > 16 || ts2 < 1 || ts2 > 8 || brp < 1 || brp > 1024 {
            return None;
        }
        Some(Self { sjw, ts1, ts2, brp })
    }

    const fn table(sjw: u8, ts2: u8, ts1: u8, brp: u16) -> Self {
        match Self::new(sjw, ts1, ts2, brp) {
            Some(timing) => timing,
            None => panic!("bit timing out of range"),
        }
    }

    pub const fn sjw(&self) -> u8 {
        self.sjw
    }

    pub const fn ts1(&self) -> u8 {
        self.ts1
    }

    pub const fn ts2(&self) -> u8 {
        self.ts2
    }

    pub const fn prescaler(&self) -> u16 {
        self.brp
    }

    /// Pack into the hardware layout: `(SJW-1)<<24 | (TS2-1)<<20 | (TS1-1)<<16 | (BRP-1)`.
    pub const fn to_register(&self) -> u32 {
        ((self.sjw as u32 - 1) << 24)
            | ((self.ts2 as u32 - 1) << 20)
            | ((self.ts1 as u32 - 1) << 16)
            | (self.brp as u32 - 1)
    }

    /// Unpack the timing fields of a raw register value; other bits are ignored.
    /// Every masked value is in range, so this never fails.
    pub const fn from_register(raw: u32) -> Self {
        Self {
            sjw: ((raw >> 24) & 0x3) as u8 + 1,
            ts2: ((raw >> 20) & 0x7) as u8 + 1,
            ts1: ((raw >> 16) & 0xF) as u8 + 1,
            brp: (raw & 0x3FF) as u16 + 1,
        }
    }

    /// Expand the 16-bit `sXXXX` argument: low 9 bits are the prescaler field,
    /// high 7 bits land on TS1/TS2 (register bits 16..22). SJW stays at 1.
    pub const fn from_slcan_custom(value: u16) -> Self {
        let value = value as u32;
        Self::from_register((value & 0x01FF) | ((value & 0xFE00) << 7))
    }

    /// Inverse of [`BitTiming::from_slcan_custom`] for the fields it carries.
    pub const fn to_slcan_custom(&self) -> u16 {
        let raw = self.to_register();
        ((raw & 0x01FF) | ((raw & (0xFE00 << 7)) >> 7)) as u16
    }

    /// Resulting bitrate for a given peripheral clock.
    pub const fn bitrate(&self, pclk_hz: u32) -> u32 {
        pclk_hz / (self.brp as u32 * (1 + self.ts1 as u32 + self.ts2 as u32))
    }
}

//==================================================================================BITRATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Canonical slcan bitrates selected by `S0`..`S8`.
pub enum Bitrate {
    Kbit10,
    Kbit20,
    Kbit50,
    Kbit100,
    Kbit125,
    Kbit250,
    Kbit500,
    Kbit800,
    Mbit1,
}

impl Bitrate {
    /// All table entries, in `S` index order.
    pub const ALL: [Bitrate; 9] = [
        Bitrate::Kbit10,
        Bitrate::Kbit20,
        Bitrate::Kbit50,
        Bitrate::Kbit100,
        Bitrate::Kbit125,
        Bitrate::Kbit250,
        Bitrate::Kbit500,
        Bitrate::Kbit800,
        Bitrate::Mbit1,
    ];

    /// Table entry for index 0–8.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn kbps(&self) -> u16 {
        match self {
            Bitrate::Kbit10 => 10,
            Bitrate::Kbit20 => 20,
            Bitrate::Kbit50 => 50,
            Bitrate::Kbit100 => 100,
            Bitrate::Kbit125 => 125,
            Bitrate::Kbit250 => 250,
            Bitrate::Kbit500 => 500,
            Bitrate::Kbit800 => 800,
            Bitrate::Mbit1 => 1_000,
        }
    }

    /// Precomputed timing for a 48 MHz peripheral clock.
    pub const fn timing(&self) -> BitTiming {
        match self {
            Bitrate::Kbit10 => BitTiming::table(1, 7, 8, 300),
            Bitrate::Kbit20 => BitTiming::table(1, 7, 8, 150),
            Bitrate::Kbit50 => BitTiming::table(1, 7, 8, 60),
            Bitrate::Kbit100 => BitTiming::table(1, 7, 8, 30),
            Bitrate::Kbit125 => BitTiming::table(1, 7, 8, 24),
            Bitrate::Kbit250 => BitTiming::table(1, 7, 8, 12),
            Bitrate::Kbit500 => BitTiming::table(1, 7, 8, 6),
            Bitrate::Kbit800 => BitTiming::table(1, 5, 6, 5),
            Bitrate::Mbit1 => BitTiming::table(1, 7, 8, 3),
        }
    }
}

impl From<Bitrate> for BitTiming {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.timing()
    }
}
