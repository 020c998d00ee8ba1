//! Logical data pipes

use crate::log::warn;

/// Largest pipe domain the registry can track
pub const MAX_PIPES: u8 = 64;

/// A set of pipe ids, the LSb is pipe zero
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeSet(pub u64);

impl PipeSet {
    pub const EMPTY: Self = Self(0);

    /// Every pipe id below `count`
    pub const fn first(count: u8) -> Self {
        if count >= MAX_PIPES {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Builds a set from the little-endian bitmap found in `PipeStatus`.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    pub fn contains(&self, pipe: u8) -> bool {
        pipe < MAX_PIPES && self.0 & (1 << pipe) != 0
    }

    pub fn insert(&mut self, pipe: u8) {
        if pipe < MAX_PIPES {
            self.0 |= 1 << pipe;
        }
    }

    pub fn remove(&mut self, pipe: u8) {
        if pipe < MAX_PIPES {
            self.0 &= !(1 << pipe);
        }
    }

    pub fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> {
        let set = *self;
        (0..MAX_PIPES).filter(move |&p| set.contains(p))
    }
}

impl core::ops::Not for PipeSet {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Where the characteristic behind a pipe lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipeStore {
    Local,
    Remote,
}

/// Transfer type of a pipe, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipeKind {
    /// Notification to the peer
    Tx,
    /// Indication to the peer
    TxAck,
    /// Write without response from the peer
    Rx,
    /// Write with response from the peer
    RxAck,
    /// Readable by the peer, updated locally
    Set,
}

impl PipeKind {
    pub fn is_tx(&self) -> bool {
        matches!(self, PipeKind::Tx | PipeKind::TxAck)
    }
}

/// One row of the board's pipe table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeType {
    pub pipe: u8,
    pub store: PipeStore,
    pub kind: PipeKind,
}

/// Last pipe error reported by the coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeError {
    pub pipe: u8,
    pub code: u8,
}

#[derive(Debug, Clone)]
pub struct PipeRegistry {
    domain: PipeSet,
    open: PipeSet,
    closed: PipeSet,
    types: &'static [PipeType],
    last_error: Option<PipeError>,
}

impl PipeRegistry {
    /// Creates a registry for pipes `0..pipe_count` with every pipe closed.
    pub fn new(pipe_count: u8, types: &'static [PipeType]) -> Self {
        if pipe_count > MAX_PIPES {
            warn!("Pipe count {} clamped to {}", pipe_count, MAX_PIPES);
        }
        let domain = PipeSet::first(pipe_count);
        Self {
            domain,
            open: PipeSet::EMPTY,
            closed: domain,
            types,
            last_error: None,
        }
    }

    /// Replace the pipe state with the content of a `PipeStatus` event.
    ///
    /// The open set is authoritative, everything else in the domain is closed.
    pub fn on_pipe_status(&mut self, open: PipeSet, closed: PipeSet) {
        let outside = open.union(closed).intersection(!self.domain);
        if !outside.is_empty() {
            warn!("Pipe status outside of domain: {:x}", outside.0);
        }

        let open = open.intersection(self.domain);
        let complement = self.domain.intersection(!open);
        if closed.intersection(self.domain) != complement {
            warn!(
                "Closed pipes {:x} disagree with open pipes {:x}",
                closed.0, open.0
            );
        }

        self.open = open;
        self.closed = complement;
    }

    pub fn on_pipe_error(&mut self, pipe: u8, code: u8) {
        if !self.in_domain(pipe) {
            warn!("Pipe error for unknown pipe {}: {:x}", pipe, code);
            return;
        }
        self.last_error = Some(PipeError { pipe, code });
    }

    pub fn is_open(&self, pipe: u8) -> bool {
        if !self.in_domain(pipe) {
            warn!("Pipe {} is not configured", pipe);
            return false;
        }
        self.open.contains(pipe)
    }

    pub fn is_closed(&self, pipe: u8) -> bool {
        if !self.in_domain(pipe) {
            warn!("Pipe {} is not configured", pipe);
            return false;
        }
        self.closed.contains(pipe)
    }

    pub fn pipe_type(&self, pipe: u8) -> Option<PipeType> {
        self.types.iter().find(|t| t.pipe == pipe).copied()
    }

    pub fn open(&self) -> PipeSet {
        self.open
    }

    pub fn closed(&self) -> PipeSet {
        self.closed
    }

    pub fn domain(&self) -> PipeSet {
        self.domain
    }

    pub fn last_error(&self) -> Option<PipeError> {
        self.last_error
    }

    fn in_domain(&self, pipe: u8) -> bool {
        self.domain.contains(pipe)
    }
}
