use crate::Error;
use crate::command::Command;
use crate::credit::CreditTracker;
use crate::event::CommandStatus;
use crate::log::{debug, error, info, warn};
use crate::transport::{Transport, send_with_credit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoaderState {
    Idle,
    /// `in_flight` is set while the block at the cursor waits for its response
    Sending { in_flight: bool },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    Pending,
    Complete,
}

pub struct SetupLoader {
    blocks: &'static [&'static [u8]],
    cursor: usize,
    state: LoaderState,
}

impl SetupLoader {
    pub fn new(blocks: &'static [&'static [u8]]) -> Self {
        Self {
            blocks,
            cursor: 0,
            state: LoaderState::Idle,
        }
    }

    /// Begin the transaction. Completes at once if there is nothing to send.
    pub fn start(&mut self) -> Progress {
        if self.state != LoaderState::Idle {
            return self.progress();
        }
        if self.blocks.is_empty() {
            info!("No setup data, setup complete");
            self.state = LoaderState::Complete;
        } else {
            self.state = LoaderState::Sending { in_flight: false };
        }
        self.progress()
    }

    /// Send the block at the cursor unless one is already waiting for its response.
    ///
    /// Returns `true` if a block went out. Without credit nothing is sent and the same block is
    /// tried again on the next step.
    pub fn step<T: Transport>(
        &mut self,
        credits: &mut CreditTracker,
        transport: &mut T,
    ) -> bool {
        let LoaderState::Sending { in_flight: false } = self.state else {
            return false;
        };
        let Some(block) = self.blocks.get(self.cursor) else {
            return false;
        };

        match send_with_credit(transport, credits, &Command::Setup(block)) {
            Ok(()) => {
                debug!("Setup block {}/{} sent", self.cursor + 1, self.blocks.len());
                self.state = LoaderState::Sending { in_flight: true };
                true
            }
            Err(_) => false,
        }
    }

    /// Feed the response to the block in flight.
    pub fn on_response(&mut self, status: CommandStatus) -> Result<Progress, Error> {
        match status {
            CommandStatus::TransactionContinue => {
                self.cursor += 1;
                if self.cursor >= self.blocks.len() {
                    error!("Setup asked for more than {} blocks", self.blocks.len());
                    return Err(Error::SetupOverrun);
                }
                self.state = LoaderState::Sending { in_flight: false };
            }
            CommandStatus::TransactionComplete => {
                self.cursor += 1;
                info!("Setup complete after {} blocks", self.cursor);
                self.state = LoaderState::Complete;
            }
            other => {
                error!(
                    "Setup block {} failed with status {:x}",
                    self.cursor,
                    other.raw()
                );
                return Err(Error::SetupFailed(other));
            }
        }
        Ok(self.progress())
    }

    /// Give up on the transaction. The response to a block in flight is no longer expected.
    pub fn abandon(&mut self) {
        if let LoaderState::Sending { .. } = self.state {
            warn!("Setup abandoned at block {}", self.cursor);
            self.state = LoaderState::Idle;
        }
    }

    pub fn progress(&self) -> Progress {
        match self.state {
            LoaderState::Complete => Progress::Complete,
            _ => Progress::Pending,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == LoaderState::Sending { in_flight: true }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Index of the next block to be acknowledged
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::transport::Busy;

    #[derive(Default)]
    struct Recorder {
        sent: std::vec::Vec<std::vec::Vec<u8>>,
        busy: bool,
    }

    impl Transport for Recorder {
        fn send(&mut self, command: &Command<'_>) -> Result<(), Busy> {
            if self.busy {
                return Err(Busy);
            }
            match command {
                Command::Setup(data) => self.sent.push(data.to_vec()),
                other => panic!("unexpected command {other:?}"),
            }
            Ok(())
        }

        fn poll(&mut self) -> Option<Event> {
            None
        }
    }

    static BLOCKS: [&[u8]; 3] = [&[1, 1], &[2, 2], &[3, 3]];

    fn credits(n: u8) -> CreditTracker {
        let mut c = CreditTracker::new();
        c.reset(n);
        c
    }

    #[test]
    fn test_three_blocks_in_order() {
        let mut loader = SetupLoader::new(&BLOCKS);
        let mut credits = credits(2);
        let mut t = Recorder::default();

        assert_eq!(loader.start(), Progress::Pending);
        assert!(loader.step(&mut credits, &mut t));
        // already in flight
        assert!(!loader.step(&mut credits, &mut t));

        assert_eq!(
            loader.on_response(CommandStatus::TransactionContinue),
            Ok(Progress::Pending)
        );
        credits.grant(1);
        assert!(loader.step(&mut credits, &mut t));
        assert_eq!(
            loader.on_response(CommandStatus::TransactionContinue),
            Ok(Progress::Pending)
        );
        credits.grant(1);
        assert!(loader.step(&mut credits, &mut t));
        assert_eq!(
            loader.on_response(CommandStatus::TransactionComplete),
            Ok(Progress::Complete)
        );

        assert!(!loader.step(&mut credits, &mut t));
        assert_eq!(t.sent, [[1, 1], [2, 2], [3, 3]]);
        assert_eq!(loader.cursor(), 3);
        assert_eq!(loader.state(), LoaderState::Complete);
    }

    #[test]
    fn test_empty_setup_completes_without_sending() {
        let mut loader = SetupLoader::new(&[]);
        let mut credits = credits(2);
        let mut t = Recorder::default();

        assert_eq!(loader.start(), Progress::Complete);
        assert!(!loader.step(&mut credits, &mut t));
        assert!(t.sent.is_empty());
    }

    #[test]
    fn test_no_credit_holds_block() {
        let mut loader = SetupLoader::new(&BLOCKS);
        let mut credits = credits(0);
        let mut t = Recorder::default();

        loader.start();
        assert!(!loader.step(&mut credits, &mut t));
        assert_eq!(loader.cursor(), 0);

        credits.reset(1);
        assert!(loader.step(&mut credits, &mut t));
        assert_eq!(t.sent, [[1, 1]]);
    }

    #[test]
    fn test_busy_transport_keeps_credit() {
        let mut loader = SetupLoader::new(&BLOCKS);
        let mut credits = credits(1);
        let mut t = Recorder {
            busy: true,
            ..Default::default()
        };

        loader.start();
        assert!(!loader.step(&mut credits, &mut t));
        assert_eq!(credits.available(), 1);
        assert!(!loader.is_in_flight());
    }

    #[test]
    fn test_error_status_fails() {
        let mut loader = SetupLoader::new(&BLOCKS);
        let mut credits = credits(1);
        let mut t = Recorder::default();

        loader.start();
        loader.step(&mut credits, &mut t);
        assert_eq!(
            loader.on_response(CommandStatus::Error(0x88)),
            Err(Error::SetupFailed(CommandStatus::Error(0x88)))
        );
        assert_eq!(loader.cursor(), 0);
    }

    #[test]
    fn test_abandon_drops_block_in_flight() {
        let mut loader = SetupLoader::new(&BLOCKS);
        let mut credits = credits(2);
        let mut t = Recorder::default();

        loader.start();
        assert!(loader.step(&mut credits, &mut t));
        loader.abandon();
        assert!(!loader.is_in_flight());
        assert_eq!(loader.state(), LoaderState::Idle);
        assert!(!loader.step(&mut credits, &mut t));
        assert_eq!(t.sent, [[1, 1]]);
        assert_eq!(loader.cursor(), 0);

        let mut done = SetupLoader::new(&[]);
        done.start();
        done.abandon();
        assert_eq!(done.progress(), Progress::Complete);
    }

    #[test]
    fn test_continue_after_last_block_fails() {
        static ONE: [&[u8]; 1] = [&[9]];
        let mut loader = SetupLoader::new(&ONE);
        let mut credits = credits(1);
        let mut t = Recorder::default();

        loader.start();
        loader.step(&mut credits, &mut t);
        assert_eq!(
            loader.on_response(CommandStatus::TransactionContinue),
            Err(Error::SetupOverrun)
        );
    }
}
