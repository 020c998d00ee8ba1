use embassy_time::Instant;

use crate::Error;
use crate::clock::Clock;
use crate::command::{self, Advertising, Command, TestMode};
use crate::config::{BootAction, Config};
use crate::credit::CreditTracker;
use crate::event::{CommandStatus, DeviceMode, Event, Payload};
use crate::log::{debug, error, info, trace, warn};
use crate::pipes::PipeRegistry;
use crate::setup::{Progress, SetupLoader};
use crate::transport::{Transport, send_with_credit};

/// Largest application payload accepted by `SendData`
pub const MAX_DATA_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Waiting for the first `DeviceStarted`
    AwaitStart,
    Setup,
    Standby,
    Advertising,
    Connected,
    Testing,
    /// Terminal
    Fatal,
}

/// Bookkeeping of the echo soak test
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EchoSoak {
    /// Echo commands of the current batch that went out
    issued: u8,
    /// Echo commands of the current batch still waiting for credit
    to_issue: u8,
    /// Echo events received for the current batch
    received: u8,
    mismatches: u32,
    rounds: u32,
}

impl EchoSoak {
    fn start_batch(&mut self, size: u8) {
        self.issued = 0;
        self.received = 0;
        self.to_issue = size;
    }

    /// Count one echo answer, starting a new batch once `batch` answers are in.
    fn on_answer(&mut self, matched: bool, batch: u8) {
        if !matched {
            self.mismatches = self.mismatches.wrapping_add(1);
        }
        self.received = self.received.saturating_add(1);
        if batch > 0 && self.received >= batch {
            self.rounds = self.rounds.wrapping_add(1);
            self.start_batch(batch);
        }
    }

    pub fn issued(&self) -> u8 {
        self.issued
    }

    pub fn received(&self) -> u8 {
        self.received
    }

    pub fn mismatches(&self) -> u32 {
        self.mismatches
    }

    /// Completed batches
    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

pub struct Session<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    config: Config,

    state: State,
    mode: Option<DeviceMode>,
    credits: CreditTracker,
    pipes: PipeRegistry,
    setup: SetupLoader,
    connected: bool,
    last_error: Option<Error>,
    echo: EchoSoak,
    last_event_at: Option<Instant>,

    pending_advertise: Option<Advertising>,
    pending_test: Option<TestMode>,
}

impl<T: Transport, C: Clock> Session<T, C> {
    pub fn new(transport: T, clock: C, config: Config) -> Self {
        let pipes = PipeRegistry::new(config.pipe_count, config.pipe_types);
        let setup = SetupLoader::new(config.setup_blocks);
        Self {
            transport,
            clock,
            config,
            state: State::AwaitStart,
            mode: None,
            credits: CreditTracker::new(),
            pipes,
            setup,
            connected: false,
            last_error: None,
            echo: EchoSoak::default(),
            last_event_at: None,
            pending_advertise: None,
            pending_test: None,
        }
    }

    /// Run the poll loop until the session becomes fatal.
    ///
    /// When no event is pending the loop parks in [`Transport::wait_ready`].
    pub async fn run(&mut self) -> Error {
        loop {
            if let Some(err) = self.fatal_error() {
                return err;
            }
            if self.process().is_none() {
                self.transport.wait_ready().await;
            }
        }
    }

    /// One iteration of the poll loop: handle at most one event, then send any deferred work.
    ///
    /// The handled event is handed back so the application can act on received data.
    pub fn process(&mut self) -> Option<Event> {
        let event = self.transport.poll();

        if self.state == State::Fatal {
            if let Some(event) = &event {
                trace!("Dropping event {:x}, session is fatal", event.opcode());
                #[cfg(not(feature = "defmt"))]
                let _ = event;
            }
            return event;
        }

        if let Some(event) = &event {
            self.last_event_at = Some(self.clock.now());
            if let Err(e) = self.dispatch(event) {
                self.fail(e);
            }
        }

        if self.state != State::Fatal {
            self.pump();
        }
        event
    }

    /// Send application data on an open transmit pipe.
    pub fn send_data(&mut self, pipe: u8, data: &[u8]) -> Result<(), Error> {
        if self.state == State::Fatal {
            return Err(Error::Fatal);
        }
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if data.len() > MAX_DATA_LEN {
            return Err(Error::BufferTooLong);
        }
        if !self.pipes.is_open(pipe) {
            return Err(Error::PipeNotOpen(pipe));
        }
        if let Some(t) = self.pipes.pipe_type(pipe) {
            if !t.kind.is_tx() {
                return Err(Error::PipeNotWritable(pipe));
            }
        }
        send_with_credit(
            &mut self.transport,
            &mut self.credits,
            &Command::SendData { pipe, data },
        )
    }

    fn dispatch(&mut self, event: &Event) -> Result<(), Error> {
        match event {
            Event::DeviceStarted {
                mode,
                hw_error,
                credits,
            } => self.on_device_started(*mode, *hw_error, *credits),
            Event::CmdResponse { opcode, status } => {
                // the answered command no longer occupies a slot
                self.credits.grant(1);
                self.on_command_response(*opcode, *status)?
            }
            Event::Echo(payload) => {
                self.credits.grant(1);
                self.on_echo(payload)
            }
            Event::Connected => {
                info!("Connected");
                self.connected = true;
                self.transition(State::Connected);
            }
            Event::PipeStatus { open, closed } => self.pipes.on_pipe_status(*open, *closed),
            Event::Disconnected {
                aci_status,
                btle_status,
            } => {
                info!(
                    "Disconnected or advertising timed out, status {:x}/{:x}",
                    aci_status, btle_status
                );
                #[cfg(not(feature = "defmt"))]
                let _ = (aci_status, btle_status);
                self.connected = false;
                if matches!(self.state, State::Connected | State::Advertising) {
                    self.advertise(self.config.advertising);
                }
            }
            Event::PipeError { pipe, code } => {
                warn!("Pipe {} error {:x}", pipe, code);
                self.pipes.on_pipe_error(*pipe, *code);
                if self.config.refunds_credit(*code) {
                    self.credits.grant(1);
                }
            }
            Event::DataCredit { credits } => self.credits.grant(*credits),
            Event::DataReceived { pipe, data } => {
                debug!("Pipe {} received {=[u8]:x}", pipe, data.as_slice());
                #[cfg(not(feature = "defmt"))]
                let _ = (pipe, data);
            }
            Event::HardwareError { line, file } => {
                error!(
                    "Hardware error at {=[u8]:a}:{}",
                    file.as_slice(),
                    line
                );
                #[cfg(not(feature = "defmt"))]
                let _ = (line, file);
                // no further setup blocks until the next DeviceStarted
                self.setup.abandon();
                self.advertise(self.config.recovery_advertising);
            }
            Event::Unknown { opcode } => {
                debug!("Ignoring unknown event {:x}", opcode);
                #[cfg(not(feature = "defmt"))]
                let _ = opcode;
            }
        }
        Ok(())
    }

    fn on_device_started(&mut self, mode: DeviceMode, hw_error: bool, credits: u8) {
        info!("Device started: {}, {} credits", mode, credits);
        self.mode = Some(mode);
        self.credits.reset(credits);
        self.connected = false;
        self.pending_advertise = None;
        self.pending_test = None;
        self.setup.abandon();

        match mode {
            DeviceMode::Setup => {
                self.transition(State::Setup);
                match self.config.boot {
                    BootAction::Provision => {
                        self.setup = SetupLoader::new(self.config.setup_blocks);
                        if self.setup.start() == Progress::Complete {
                            self.transition(State::Standby);
                        }
                    }
                    BootAction::LinkTest(test) => self.pending_test = Some(test),
                }
            }
            DeviceMode::Standby if hw_error => {
                warn!("Restarted after hardware error, settling");
                self.clock.delay(self.config.hw_error_settle);
                self.transition(State::Standby);
            }
            DeviceMode::Standby => {
                self.transition(State::Standby);
                self.advertise(self.config.advertising);
            }
            DeviceMode::Test => {
                self.transition(State::Testing);
                info!("Starting echo test");
                self.clock.delay(self.config.test_settle);
                self.echo = EchoSoak {
                    mismatches: self.echo.mismatches,
                    ..Default::default()
                };
                self.echo.start_batch(self.config.echo_batch);
            }
            DeviceMode::Connected => {}
        }
    }

    fn on_command_response(&mut self, opcode: u8, status: CommandStatus) -> Result<(), Error> {
        if self.state == State::Setup
            && opcode == command::opcode::SETUP
            && self.setup.is_in_flight()
        {
            if self.setup.on_response(status)? == Progress::Complete {
                self.transition(State::Standby);
            }
            return Ok(());
        }

        if opcode == command::opcode::SETUP
            && matches!(
                status,
                CommandStatus::TransactionContinue | CommandStatus::TransactionComplete
            )
        {
            debug!("Stale setup response {:x} ignored", status.raw());
            return Ok(());
        }

        if status != CommandStatus::Success {
            error!(
                "Command {:x} failed with status {:x}",
                opcode,
                status.raw()
            );
            return Err(Error::CommandFailed { opcode, status });
        }
        trace!("Command {:x} ok", opcode);
        Ok(())
    }

    fn on_echo(&mut self, payload: &Payload) {
        if self.state != State::Testing {
            debug!("Echo outside of test mode ignored");
            return;
        }

        let matched = payload.as_slice() == self.config.echo_pattern;
        if matched {
            trace!("Echo OK");
        } else {
            warn!("Echo mismatch, check the link to the coprocessor");
        }
        self.echo.on_answer(matched, self.config.echo_batch);
    }

    fn advertise(&mut self, advertising: Advertising) {
        self.pending_advertise = Some(advertising);
        self.transition(State::Advertising);
    }

    /// Send deferred work, as far as credit allows.
    fn pump(&mut self) {
        if let Some(test) = self.pending_test {
            let cmd = Command::Test(test);
            if send_with_credit(&mut self.transport, &mut self.credits, &cmd).is_ok() {
                info!("Entering test mode {}", test);
                self.pending_test = None;
            }
        }

        if self.state == State::Setup {
            self.setup.step(&mut self.credits, &mut self.transport);
        }

        if let Some(advertising) = self.pending_advertise {
            let cmd = Command::Connect(advertising);
            if send_with_credit(&mut self.transport, &mut self.credits, &cmd).is_ok() {
                info!("Advertising started, interval {:x}", advertising.interval);
                self.pending_advertise = None;
            }
        }

        if self.state == State::Testing {
            let cmd = Command::Echo(self.config.echo_pattern);
            while self.echo.to_issue > 0 {
                if send_with_credit(&mut self.transport, &mut self.credits, &cmd).is_err() {
                    break;
                }
                self.echo.to_issue -= 1;
                self.echo.issued += 1;
            }
        }
    }

    fn fail(&mut self, err: Error) {
        error!("Session stopped: {}", err);
        self.last_error = Some(err);
        self.pending_advertise = None;
        self.pending_test = None;
        self.echo.to_issue = 0;
        self.transition(State::Fatal);
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            info!("{} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn fatal_error(&self) -> Option<Error> {
        match self.state {
            State::Fatal => Some(self.last_error.clone().unwrap_or(Error::Fatal)),
            _ => None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Mode from the last `DeviceStarted`, `None` before the first one
    pub fn mode(&self) -> Option<DeviceMode> {
        self.mode
    }

    pub fn credits(&self) -> &CreditTracker {
        &self.credits
    }

    pub fn pipes(&self) -> &PipeRegistry {
        &self.pipes
    }

    pub fn setup(&self) -> &SetupLoader {
        &self.setup
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn echo(&self) -> &EchoSoak {
        &self.echo
    }

    pub fn last_event_at(&self) -> Option<Instant> {
        self.last_event_at
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_counters_wrap() {
        let mut soak = EchoSoak {
            mismatches: u32::MAX,
            rounds: u32::MAX,
            ..Default::default()
        };
        soak.start_batch(1);
        soak.on_answer(false, 1);
        assert_eq!(soak.mismatches(), 0);
        assert_eq!(soak.rounds(), 0);
        assert_eq!(soak.received(), 0);
        assert_eq!(soak.to_issue, 1);
    }

    #[test]
    fn test_echo_batch_completes() {
        let mut soak = EchoSoak::default();
        soak.start_batch(3);
        soak.on_answer(true, 3);
        soak.on_answer(false, 3);
        assert_eq!(soak.received(), 2);
        soak.on_answer(true, 3);
        assert_eq!(soak.received(), 0);
        assert_eq!(soak.rounds(), 1);
        assert_eq!(soak.mismatches(), 1);
    }
}
