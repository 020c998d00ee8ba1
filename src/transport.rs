use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;

use crate::Error;
use crate::command::Command;
use crate::credit::CreditTracker;
use crate::event::Event;
use crate::log::trace;

/// The link could not take a command right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy;

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Queue a command for transmission. Must not block.
    fn send(&mut self, command: &Command<'_>) -> Result<(), Busy>;

    /// Take the next decoded event, if one is pending. Must not block.
    fn poll(&mut self) -> Option<Event>;

    /// Wait until the coprocessor has something for us.
    ///
    /// The default just yields once, which turns the run loop into a busy poll.
    async fn wait_ready(&mut self) {
        embassy_futures::yield_now().await
    }
}

/// Send `command` if a credit is available.
///
/// The credit is given back when the transport turns the command away, since nothing reached the
/// coprocessor.
pub(crate) fn send_with_credit<T: Transport>(
    transport: &mut T,
    credits: &mut CreditTracker,
    command: &Command<'_>,
) -> Result<(), Error> {
    if !credits.try_reserve() {
        trace!("No credit for command {:x}", command.opcode());
        return Err(Error::NoCredit);
    }
    if transport.send(command).is_err() {
        credits.grant(1);
        trace!("Transport busy for command {:x}", command.opcode());
        return Err(Error::Busy);
    }
    Ok(())
}

/// Latch for the coprocessor's data-ready line.
///
/// `signal` is meant to be called from the pin interrupt; `wait` completes once per signal.
pub struct ReadySignal {
    pending: AtomicBool,
    waker: AtomicWaker,
}

impl ReadySignal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            waker: AtomicWaker::new(),
        }
    }

    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        core::future::poll_fn(|cx| {
            self.waker.register(cx.waker());
            if self.pending.swap(false, Ordering::AcqRel) {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}
