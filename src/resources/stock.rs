use super::ResourceError;
use std::collections::VecDeque;

/// Outcome of [`StockContainer::withdraw()`].
#[derive(Debug, PartialEq, Eq)]
pub enum Withdrawal<T> {
    /// The level covered the request and has already been reduced; the payload comes straight back.
    Complete(T),
    /// Not enough stock, or earlier withdrawals are still waiting. The payload is parked until a deposit covers it.
    Pending,
}

/// A bounded inventory level with blocking, first-come-first-served withdrawals.
///
/// Invariant: `0 <= level <= capacity`. A waiting withdrawal blocks every withdrawal behind it, even ones the current
/// level could cover, so requests are always filled in the order they were made.
#[derive(Debug)]
pub struct StockContainer<T> {
    capacity: u32,
    level: u32,
    waiting: VecDeque<(u32, T)>,
}

impl<T> StockContainer<T> {
    /// Create a container holding `initial` units out of a possible `capacity`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Overflow`] if `initial` exceeds `capacity`.
    pub fn new(initial: u32, capacity: u32) -> Result<Self, ResourceError> {
        if initial > capacity {
            return Err(ResourceError::Overflow {
                level: 0,
                quantity: initial,
                capacity,
            });
        }

        Ok(Self {
            capacity,
            level: initial,
            waiting: VecDeque::new(),
        })
    }

    /// Take `quantity` units, or park `payload` until a deposit makes them available.
    ///
    /// # Errors
    ///
    /// [`ResourceError::ExceedsCapacity`] if `quantity` is larger than the capacity, since such a request could never
    /// be satisfied and would otherwise wait forever.
    pub fn withdraw(&mut self, quantity: u32, payload: T) -> Result<Withdrawal<T>, ResourceError> {
        if quantity > self.capacity {
            return Err(ResourceError::ExceedsCapacity {
                requested: quantity,
                capacity: self.capacity,
            });
        }

        if self.waiting.is_empty() && quantity <= self.level {
            self.level -= quantity;
            return Ok(Withdrawal::Complete(payload));
        }

        self.waiting.push_back((quantity, payload));
        Ok(Withdrawal::Pending)
    }

    /// Add `quantity` units, then fill waiting withdrawals from the front of the queue for as long as the remaining
    /// level covers them. Returns the payloads of the withdrawals that completed, in queue order.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Overflow`] if the level would exceed the capacity. The container is left unchanged.
    pub fn deposit(&mut self, quantity: u32) -> Result<Vec<T>, ResourceError> {
        let overflow = ResourceError::Overflow {
            level: self.level,
            quantity,
            capacity: self.capacity,
        };
        self.level = match self.level.checked_add(quantity) {
            Some(level) if level <= self.capacity => level,
            _ => return Err(overflow),
        };

        let mut completed = Vec::new();
        while let Some((requested, _)) = self.waiting.front() {
            if *requested > self.level {
                break;
            }
            self.level -= *requested;
            if let Some((_, payload)) = self.waiting.pop_front() {
                completed.push(payload);
            }
        }
        Ok(completed)
    }

    /// Units currently on the shelf.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Maximum number of units the container can hold.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of withdrawals waiting for stock.
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }
}
