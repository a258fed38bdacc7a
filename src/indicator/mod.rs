//! Activity LEDs driven by one free-running timer with two compare channels.
//!
//! A blink drives the channel's LED high right away and arms the channel's
//! compare interrupt `hold` ticks later; the interrupt drives it low again.
//! Re-blinking an active channel just moves the compare target. The same
//! counter doubles as the millisecond timestamp source for received frames.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
#[cfg(feature = "defmt")]
use embedded_hal::digital::Error as _;
use embedded_hal::digital::OutputPin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Compare channel, one per activity LED.
pub enum BlinkChannel {
    /// Frame received (compare channel 1).
    Rx,
    /// Frame transmitted (compare channel 2).
    Tx,
}

//==================================================================================TRAITS
/// Hardware timer: free-running up-counter wrapping at `period()` with two
/// compare channels.
pub trait CompareTimer {
    /// Current counter value, `0..period()`.
    fn count(&self) -> u32;
    /// Counter modulus.
    fn period(&self) -> u32;
    /// Load the compare target, clear a stale match and enable its interrupt.
    fn arm(&mut self, channel: BlinkChannel, target: u32);
    /// Disable the channel's compare interrupt.
    fn disarm(&mut self, channel: BlinkChannel);
    /// Test and clear the channel's compare match flag.
    fn take_match(&mut self, channel: BlinkChannel) -> bool;
}

/// Narrow view of the indicator handed to the driver. Callable through `&self`
/// from both the main loop and interrupt handlers.
pub trait Activity {
    fn blink(&self, channel: BlinkChannel);
    fn link(&self, up: bool);
    /// Timestamp sample (timer ticks modulo the period).
    fn timestamp(&self) -> u16;
}

impl<T: Activity + ?Sized> Activity for &T {
    fn blink(&self, channel: BlinkChannel) {
        (**self).blink(channel)
    }

    fn link(&self, up: bool) {
        (**self).link(up)
    }

    fn timestamp(&self) -> u16 {
        (**self).timestamp()
    }
}

/// No LEDs, timestamps stay at zero.
impl Activity for () {
    fn blink(&self, _channel: BlinkChannel) {}

    fn link(&self, _up: bool) {}

    fn timestamp(&self) -> u16 {
        0
    }
}

//==================================================================================ACTIVITY_INDICATOR
#[derive(Clone, Copy)]
enum Led {
    Rx,
    Tx,
    Link,
}

impl From<BlinkChannel> for Led {
    fn from(channel: BlinkChannel) -> Self {
        match channel {
            BlinkChannel::Rx => Led::Rx,
            BlinkChannel::Tx => Led::Tx,
        }
    }
}

/// Owner of the timer and the three activity pins (RX, TX, link).
pub struct ActivityIndicator<T, P> {
    timer: T,
    rx: P,
    tx: P,
    link: P,
    pin_faults: u32,
}

impl<T: CompareTimer, P: OutputPin> ActivityIndicator<T, P> {
    /// Takes the pins low and both compare channels out of service.
    pub fn new(mut timer: T, rx: P, tx: P, link: P) -> Self {
        timer.disarm(BlinkChannel::Rx);
        timer.disarm(BlinkChannel::Tx);
        let mut indicator = Self {
            timer,
            rx,
            tx,
            link,
            pin_faults: 0,
        };
        for led in [Led::Rx, Led::Tx, Led::Link] {
            indicator.drive(led, false);
        }
        indicator
    }

    /// Pin writes that failed so far. A failed write leaves the LED as it was.
    pub fn pin_faults(&self) -> u32 {
        self.pin_faults
    }

    fn drive(&mut self, led: Led, high: bool) {
        let pin = match led {
            Led::Rx => &mut self.rx,
            Led::Tx => &mut self.tx,
            Led::Link => &mut self.link,
        };
        let result = if high { pin.set_high() } else { pin.set_low() };
        if let Err(_error) = result {
            self.pin_faults = self.pin_faults.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("Activity pin write failed: {}", defmt::Debug2Format(&_error.kind()));
        }
    }

    /// Compare target `hold_ticks` from now, wrapped at the timer period.
    /// A hold longer than one period is clamped to one period minus a tick.
    pub fn compare_target(&self, hold_ticks: u32) -> u32 {
        let period = self.timer.period().max(1);
        let hold = hold_ticks.min(period - 1);
        ((self.timer.count() % period) + hold) % period
    }

    pub fn blink(&mut self, channel: BlinkChannel, hold_ticks: u32) {
        let target = self.compare_target(hold_ticks);
        self.drive(channel.into(), true);
        self.timer.arm(channel, target);
    }

    pub fn link(&mut self, up: bool) {
        self.drive(Led::Link, up);
    }

    pub fn timestamp(&self) -> u16 {
        self.timer.count() as u16
    }

    /// Compare interrupt entry: ends every blink whose target was reached.
    pub fn on_timer_interrupt(&mut self) {
        for channel in [BlinkChannel::Rx, BlinkChannel::Tx] {
            if self.timer.take_match(channel) {
                self.timer.disarm(channel);
                self.drive(channel.into(), false);
            }
        }
    }

    /// Give back the timer and pins.
    pub fn release(self) -> (T, P, P, P) {
        (self.timer, self.rx, self.tx, self.link)
    }
}

//==================================================================================SHARED_INDICATOR
/// [`ActivityIndicator`] behind a critical-section mutex, with a fixed blink
/// hold. This is what the driver, the CAN interrupt and the timer interrupt share.
pub struct SharedIndicator<T, P> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<ActivityIndicator<T, P>>>,
    hold_ticks: u32,
}

impl<T: CompareTimer, P: OutputPin> SharedIndicator<T, P> {
    pub fn new(indicator: ActivityIndicator<T, P>, hold_ticks: u32) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(indicator)),
            hold_ticks,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ActivityIndicator<T, P>) -> R) -> R {
        self.inner.lock(|indicator| f(&mut indicator.borrow_mut()))
    }

    /// Timer interrupt entry point.
    pub fn on_timer_interrupt(&self) {
        self.with(|indicator| indicator.on_timer_interrupt())
    }

    pub fn into_inner(self) -> ActivityIndicator<T, P> {
        self.inner.into_inner().into_inner()
    }
}

impl<T: CompareTimer, P: OutputPin> Activity for SharedIndicator<T, P> {
    fn blink(&self, channel: BlinkChannel) {
        let hold = self.hold_ticks;
        self.with(|indicator| indicator.blink(channel, hold))
    }

    fn link(&self, up: bool) {
        self.with(|indicator| indicator.link(up))
    }

    fn timestamp(&self) -> u16 {
        self.with(|indicator| indicator.timestamp())
    }
}
