use embassy_time::Duration;

use crate::command::{Advertising, TestMode};
use crate::pipes::PipeType;

const ADVERTISING_TIMEOUT_S: u16 = 180;
// 100 ms
const ADVERTISING_INTERVAL: u16 = 0x0100;
// 50 ms
const RECOVERY_ADVERTISING_INTERVAL: u16 = 0x0050;
const HW_ERROR_SETTLE: Duration = Duration::from_millis(20);
const TEST_SETTLE: Duration = Duration::from_secs(4);
const ECHO_BATCH: u8 = 3;
/// Attribute protocol error response from the peer. The packet did go out, so no credit is
/// returned for it.
pub const PEER_ATT_ERROR: u8 = 0x92;

/// Reference payload for the echo loopback test
pub const ECHO_PATTERN: [u8; 20] = [
    0x00, 0xaa, 0x55, 0xff, 0x77, 0x55, 0x33, 0x22, 0x11, 0x44, 0x66, 0x88, 0x99, 0xbb, 0xdd, 0xcc,
    0x00, 0xaa, 0x55, 0xff,
];

/// What to do when the coprocessor comes up in setup mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootAction {
    /// Replay the setup blocks
    Provision,
    /// Skip provisioning and restart the coprocessor in the given test mode, used to verify the
    /// transport with the echo soak test
    LinkTest(TestMode),
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Setup messages, replayed in order when the device starts in setup mode
    pub setup_blocks: &'static [&'static [u8]],
    /// Number of pipes defined by the setup data (at most 64)
    pub pipe_count: u8,
    /// Type of every pipe in the setup data
    pub pipe_types: &'static [PipeType],
    /// Advertising used after start-up and after a disconnect
    pub advertising: Advertising,
    /// Advertising used to recover from a hardware error
    pub recovery_advertising: Advertising,
    /// Quiet period after the device restarted because of a hardware error
    pub hw_error_settle: Duration,
    /// Wait before the echo test starts
    pub test_settle: Duration,
    /// Number of echo commands in flight per round of the soak test
    pub echo_batch: u8,
    /// Payload sent with every echo command and expected back unchanged
    pub echo_pattern: &'static [u8],
    /// Pipe error codes for which the failed packet still used a transmission slot. All other
    /// pipe errors give the credit back.
    pub no_refund_codes: &'static [u8],
    pub boot: BootAction,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            setup_blocks: &[],
            pipe_count: 0,
            pipe_types: &[],
            advertising: Advertising {
                timeout_s: ADVERTISING_TIMEOUT_S,
                interval: ADVERTISING_INTERVAL,
            },
            recovery_advertising: Advertising {
                timeout_s: ADVERTISING_TIMEOUT_S,
                interval: RECOVERY_ADVERTISING_INTERVAL,
            },
            hw_error_settle: HW_ERROR_SETTLE,
            test_settle: TEST_SETTLE,
            echo_batch: ECHO_BATCH,
            echo_pattern: &ECHO_PATTERN,
            no_refund_codes: &[PEER_ATT_ERROR],
            boot: BootAction::Provision,
        }
    }
}

impl Config {
    pub(crate) fn refunds_credit(&self, code: u8) -> bool {
        !self.no_refund_codes.contains(&code)
    }
}
