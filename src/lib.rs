#![cfg_attr(not(test), no_std)]
//! Host-side session controller for an nRF8001-class BLE coprocessor

pub mod clock;
pub mod command;
pub mod config;
pub mod credit;
pub mod event;
mod log;
pub mod pipes;
pub mod session;
pub mod setup;
pub mod transport;

pub use clock::{Clock, EmbassyClock};
pub use command::{Command, TestMode};
pub use config::Config;
pub use event::{CommandStatus, DeviceMode, Event, Payload};
pub use session::{Session, State};
pub use transport::{Busy, ReadySignal, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A setup block was answered with something other than continue/complete
    SetupFailed(CommandStatus),
    /// The coprocessor asked for another setup block after the last one was sent
    SetupOverrun,
    /// A command was answered with an error status
    CommandFailed { opcode: u8, status: CommandStatus },
    NotConnected,
    PipeNotOpen(u8),
    PipeNotWritable(u8),
    NoCredit,
    Busy,
    BufferTooLong,
    /// The session already stopped on an earlier error
    Fatal,
}

impl Error {
    /// Whether this error stops the session for good.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SetupFailed(_) | Error::SetupOverrun | Error::CommandFailed { .. } | Error::Fatal
        )
    }
}
