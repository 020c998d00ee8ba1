//! Events emitted by the coprocessor

use core::ops::Deref;

use crate::Error;
use crate::pipes::PipeSet;

/// Largest payload carried inline by an event.
///
/// An ACI event is at most 32 bytes including the length and opcode bytes.
pub const MAX_PAYLOAD_LEN: usize = 30;

pub mod opcode {
    pub const DEVICE_STARTED: u8 = 0x81;
    pub const ECHO: u8 = 0x82;
    pub const HW_ERROR: u8 = 0x83;
    pub const CMD_RSP: u8 = 0x84;
    pub const CONNECTED: u8 = 0x85;
    pub const DISCONNECTED: u8 = 0x86;
    pub const PIPE_STATUS: u8 = 0x88;
    pub const DATA_CREDIT: u8 = 0x8A;
    pub const DATA_RECEIVED: u8 = 0x8C;
    pub const PIPE_ERROR: u8 = 0x8D;
}

/// Operating mode reported by `DeviceStarted`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMode {
    Setup,
    Standby,
    Test,
    Connected,
}

/// Status byte of a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandStatus {
    Success,
    /// More setup data is expected
    TransactionContinue,
    /// The setup transaction is finished
    TransactionComplete,
    Error(u8),
}

impl CommandStatus {
    pub const SUCCESS: u8 = 0x00;
    pub const TRANSACTION_CONTINUE: u8 = 0x01;
    pub const TRANSACTION_COMPLETE: u8 = 0x02;

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::SUCCESS => Self::Success,
            Self::TRANSACTION_CONTINUE => Self::TransactionContinue,
            Self::TRANSACTION_COMPLETE => Self::TransactionComplete,
            other => Self::Error(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            Self::Success => Self::SUCCESS,
            Self::TransactionContinue => Self::TRANSACTION_CONTINUE,
            Self::TransactionComplete => Self::TRANSACTION_COMPLETE,
            Self::Error(raw) => *raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    DeviceStarted {
        mode: DeviceMode,
        /// The coprocessor restarted because of a hardware fault
        hw_error: bool,
        credits: u8,
    },
    Echo(Payload),
    CmdResponse {
        opcode: u8,
        status: CommandStatus,
    },
    Connected,
    Disconnected {
        aci_status: u8,
        btle_status: u8,
    },
    PipeStatus {
        open: PipeSet,
        closed: PipeSet,
    },
    PipeError {
        pipe: u8,
        code: u8,
    },
    DataCredit {
        credits: u8,
    },
    DataReceived {
        pipe: u8,
        data: Payload,
    },
    HardwareError {
        line: u16,
        file: Payload,
    },
    /// Anything this controller does not understand
    Unknown {
        opcode: u8,
    },
}

impl Event {
    pub fn opcode(&self) -> u8 {
        match self {
            Event::DeviceStarted { .. } => opcode::DEVICE_STARTED,
            Event::Echo(_) => opcode::ECHO,
            Event::CmdResponse { .. } => opcode::CMD_RSP,
            Event::Connected => opcode::CONNECTED,
            Event::Disconnected { .. } => opcode::DISCONNECTED,
            Event::PipeStatus { .. } => opcode::PIPE_STATUS,
            Event::PipeError { .. } => opcode::PIPE_ERROR,
            Event::DataCredit { .. } => opcode::DATA_CREDIT,
            Event::DataReceived { .. } => opcode::DATA_RECEIVED,
            Event::HardwareError { .. } => opcode::HW_ERROR,
            Event::Unknown { opcode } => *opcode,
        }
    }
}

/// Fixed-capacity inline payload
#[derive(Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload {
    len: u8,
    buf: [u8; MAX_PAYLOAD_LEN],
}

impl Payload {
    pub const fn new_empty() -> Self {
        Self {
            len: 0,
            buf: [0; MAX_PAYLOAD_LEN],
        }
    }

    pub fn new(data: &[u8]) -> Result<Self, Error> {
        let mut p = Self::new_empty();
        p.set(data)?;
        Ok(p)
    }

    pub fn set(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(Error::BufferTooLong);
        }
        self.len = data.len() as u8;
        self.buf[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Payload {}

impl core::fmt::Debug for Payload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
