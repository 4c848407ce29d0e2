use super::ResourceError;
use std::collections::VecDeque;

/// Identifies a queued request so it can be withdrawn if its patience runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Proof that one of the pool's slots is held. Must be handed back through [`CounterPool::release()`]; dropping it
/// leaks the slot for the rest of the replication.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a counter slot must be released back to its pool"]
pub struct CounterSlot {
    ticket: Ticket,
}

impl CounterSlot {
    /// The ticket of the request this slot was granted to.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// Outcome of [`CounterPool::request()`].
#[derive(Debug, PartialEq, Eq)]
pub enum Request<T> {
    /// A slot was free; the requester holds it now and gets its payload straight back.
    Granted(CounterSlot, T),
    /// Every slot is busy; the payload waits in the queue under this ticket.
    Queued(Ticket),
}

/// A fixed number of mutually exclusive service slots with a FIFO wait queue.
///
/// Invariant: `0 <= in_use <= capacity`, and a requester only ever waits while every slot is in use. Released slots
/// pass straight to the head of the queue without becoming free in between, so no later arrival can overtake a
/// waiting one.
#[derive(Debug)]
pub struct CounterPool<T> {
    capacity: usize,
    in_use: usize,
    waiting: VecDeque<(Ticket, T)>,
    next_ticket: u64,
}

impl<T> CounterPool<T> {
    /// Create a pool of `capacity` idle slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_use: 0,
            waiting: VecDeque::new(),
            next_ticket: 0,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Take a slot if one is free, otherwise join the back of the queue with `payload`.
    pub fn request(&mut self, payload: T) -> Request<T> {
        let ticket = self.issue_ticket();
        if self.in_use < self.capacity {
            self.in_use += 1;
            Request::Granted(CounterSlot { ticket }, payload)
        } else {
            self.waiting.push_back((ticket, payload));
            Request::Queued(ticket)
        }
    }

    /// Withdraw a queued request, returning its payload. Returns `None` if the request is no longer waiting, i.e. it
    /// has already been granted a slot; the grant stands in that case.
    pub fn cancel(&mut self, ticket: Ticket) -> Option<T> {
        let position = self.waiting.iter().position(|(queued, _)| *queued == ticket)?;
        self.waiting.remove(position).map(|(_, payload)| payload)
    }

    /// Give a slot back. If anyone is waiting, the slot goes directly to the head of the queue and that requester's
    /// payload is returned together with its new slot.
    ///
    /// # Errors
    ///
    /// [`ResourceError::NotHeld`] if no slot is in use.
    pub fn release(&mut self, slot: CounterSlot) -> Result<Option<(CounterSlot, T)>, ResourceError> {
        if self.in_use == 0 {
            return Err(ResourceError::NotHeld);
        }
        drop(slot);

        match self.waiting.pop_front() {
            Some((ticket, payload)) => Ok(Some((CounterSlot { ticket }, payload))),
            None => {
                self.in_use -= 1;
                Ok(None)
            },
        }
    }

    /// Whether the request behind `ticket` is still waiting for a slot.
    pub fn is_waiting(&self, ticket: Ticket) -> bool {
        self.waiting.iter().any(|(queued, _)| *queued == ticket)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of requests waiting for a slot.
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }
}
