//! Help text and settings dump printed by `h`/`?`.
use core::fmt::{self, Write};

use crate::config::BridgeConfig;
use crate::driver::bit_timing::BitTiming;
use crate::infra::queue::SharedByteQueue;
use crate::protocol::settings::Settings;

const COMMAND_LIST: &str = "Command list:\n\
Sn[CR]    - Setup with standard CAN bit-rates where n is 0-8\n\
sxxxx[CR] - Setup custom CAN bit-rates\n\
O[CR]     - Open the CAN channel in normal mode\n\
L[CR]     - Open the CAN channel in listen only mode\n\
l[CR]     - Open the CAN channel in loopback mode\n\
C[CR]     - Close the CAN channel\n\
F[CR]     - Read status flags\n\
v[CR]     - Get SW Version number\n\
V[CR]     - Get HW Version number\n\
Zn[CR]    - Sets Time Stamp ON/OFF for received frames only\n\
En[CR]    - Sets Error Reporting ON/OFF\n\
Dn[CR]    - Disable Auto Retransmitting\n\
tiiildd...[CR]      - Transmit a standard (11bit) CAN frame\n\
Tiiiiiiiildd...[CR] - Transmit an extended (29bit) CAN frame\n\
riiil[CR]           - Transmit a standard RTR (11bit) CAN frame\n\
Riiiiiiiil[CR]      - Transmit an extended RTR (29bit) CAN frame\n\
Mxxxxxxxx[CR]       - Sets Acceptance Code Register\n\
mxxxxxxxx[CR]       - Sets Acceptance Mask Register\n";

/// [`fmt::Write`] adapter appending to a byte queue. Fails once a string no
/// longer fits; the bytes that did fit stay queued.
pub struct QueueWriter<'a, const N: usize> {
    queue: &'a SharedByteQueue<N>,
}

impl<'a, const N: usize> QueueWriter<'a, N> {
    pub fn new(queue: &'a SharedByteQueue<N>) -> Self {
        Self { queue }
    }
}

impl<const N: usize> Write for QueueWriter<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.queue.push_partial(s.as_bytes()) == s.len() {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

/// Banner, command list, then the persisted settings in command form.
pub fn write_help(out: &mut impl Write, config: &BridgeConfig, settings: &Settings) -> fmt::Result {
    writeln!(out, "{}", config.banner)?;
    out.write_str(COMMAND_LIST)?;
    writeln!(
        out,
        "Current settings (EE {}valid):",
        if settings.valid { "" } else { "not " }
    )?;
    if settings.use_custom {
        let custom = BitTiming::from_register(settings.custom_timing).to_slcan_custom();
        writeln!(out, "s{:04X}", custom)?;
    } else {
        writeln!(out, "S{}", settings.bitrate)?;
    }
    writeln!(out, "Z{}", settings.timestamp as u8)?;
    writeln!(out, "E{}", settings.error_report as u8)?;
    writeln!(out, "D{}", settings.auto_retransmit_disabled as u8)?;
    writeln!(out, "M{:08X}", settings.filter_code)?;
    writeln!(out, "m{:08X}", settings.filter_mask)
}
