#![allow(dead_code)]

use std::collections::VecDeque;
use std::vec::Vec;

use embassy_nrf_aci::command::Advertising;
use embassy_nrf_aci::event::Payload;
use embassy_nrf_aci::{Busy, Clock, Command, Config, DeviceMode, Event, Session, TestMode, Transport};
use embassy_time::{Duration, Instant};

/// Owned copy of a command the session handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Test(TestMode),
    Echo(Vec<u8>),
    Setup(Vec<u8>),
    Connect(Advertising),
    Data { pipe: u8, data: Vec<u8> },
}

impl From<&Command<'_>> for Sent {
    fn from(command: &Command<'_>) -> Self {
        match command {
            Command::Test(mode) => Sent::Test(*mode),
            Command::Echo(data) => Sent::Echo(data.to_vec()),
            Command::Setup(data) => Sent::Setup(data.to_vec()),
            Command::Connect(adv) => Sent::Connect(*adv),
            Command::SendData { pipe, data } => Sent::Data {
                pipe: *pipe,
                data: data.to_vec(),
            },
        }
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub events: VecDeque<Event>,
    pub sent: Vec<Sent>,
    pub busy: bool,
    pub waits: usize,
}

impl Transport for MockTransport {
    fn send(&mut self, command: &Command<'_>) -> Result<(), Busy> {
        if self.busy {
            return Err(Busy);
        }
        self.sent.push(command.into());
        Ok(())
    }

    fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    async fn wait_ready(&mut self) {
        self.waits += 1;
    }
}

#[derive(Default)]
pub struct MockClock {
    pub delays: Vec<Duration>,
    pub elapsed: Duration,
}

impl Clock for MockClock {
    fn delay(&mut self, duration: Duration) {
        self.delays.push(duration);
        self.elapsed += duration;
    }

    fn now(&self) -> Instant {
        Instant::from_ticks(0) + self.elapsed
    }
}

pub type TestSession = Session<MockTransport, MockClock>;

pub fn session(config: Config) -> TestSession {
    Session::new(MockTransport::default(), MockClock::default(), config)
}

/// Queue `events` and process until the queue is drained.
pub fn feed(session: &mut TestSession, events: impl IntoIterator<Item = Event>) {
    session.transport_mut().events.extend(events);
    while session.process().is_some() {}
}

/// Commands sent since the last call
pub fn take_sent(session: &mut TestSession) -> Vec<Sent> {
    core::mem::take(&mut session.transport_mut().sent)
}

pub fn started(mode: DeviceMode, credits: u8) -> Event {
    Event::DeviceStarted {
        mode,
        hw_error: false,
        credits,
    }
}

pub fn response(opcode: u8, status: embassy_nrf_aci::CommandStatus) -> Event {
    Event::CmdResponse { opcode, status }
}

pub fn echo(data: &[u8]) -> Event {
    Event::Echo(Payload::new(data).unwrap())
}
