use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request generation counter.
///
/// Each request takes a ticket with [`Epoch::begin`] before suspending; when
/// its response arrives it may only act if [`Epoch::is_current`] still holds.
/// Whichever request began last wins, regardless of response order.
#[derive(Debug, Default)]
pub struct Epoch {
    current: AtomicU64,
}

/// The generation a request started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTicket(u64);

impl EpochTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl Epoch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating every earlier ticket.
    pub fn begin(&self) -> EpochTicket {
        EpochTicket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Invalidates outstanding tickets without handing out a new one.
    pub fn invalidate(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn is_current(&self, ticket: EpochTicket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
