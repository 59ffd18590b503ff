/// Ticket issued when a load starts. A completion is accepted only while its
/// ticket is still the newest one issued by the same counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Default)]
pub(crate) struct Generation {
    current: u64,
}

impl Generation {
    /// Start a new load, invalidating every ticket issued before.
    pub(crate) fn issue(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    /// Invalidate outstanding tickets without starting a load.
    pub(crate) fn invalidate(&mut self) {
        self.current += 1;
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }
}
