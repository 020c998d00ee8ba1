//! Commands issued to the coprocessor

pub mod opcode {
    pub const TEST: u8 = 0x01;
    pub const ECHO: u8 = 0x02;
    pub const SETUP: u8 = 0x06;
    pub const CONNECT: u8 = 0x0F;
    pub const SEND_DATA: u8 = 0x15;
}

/// Test mode requested by [`Command::Test`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestMode {
    /// Direct test mode driven over UART
    DtmUart,
    /// Direct test mode driven over ACI
    DtmAci,
    Exit,
}

impl TestMode {
    pub fn raw(&self) -> u8 {
        match self {
            TestMode::DtmUart => 0x01,
            TestMode::DtmAci => 0x02,
            TestMode::Exit => 0xFF,
        }
    }
}

/// Advertising parameters for [`Command::Connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Advertising {
    /// Seconds to advertise before giving up, 0 advertises forever
    pub timeout_s: u16,
    /// Advertising interval in 0.625 ms units
    pub interval: u16,
}

/// A command as handed to the transport. Payloads are borrowed from the session's tables.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    Test(TestMode),
    Echo(&'a [u8]),
    Setup(&'a [u8]),
    Connect(Advertising),
    SendData { pipe: u8, data: &'a [u8] },
}

impl Command<'_> {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Test(_) => opcode::TEST,
            Command::Echo(_) => opcode::ECHO,
            Command::Setup(_) => opcode::SETUP,
            Command::Connect(_) => opcode::CONNECT,
            Command::SendData { .. } => opcode::SEND_DATA,
        }
    }
}
