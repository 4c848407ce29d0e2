//! Resources shared by the processes of one replication.
//!
//! Both primitives are generic over the payload a blocked requester parks in their wait queue. A parked payload is
//! the suspended process: it is handed back to the caller when the request can finally be satisfied, and the caller
//! resumes the process by scheduling its next event.

mod counter_pool;
mod stock;

pub use counter_pool::{CounterPool, CounterSlot, Request, Ticket};
pub use stock::{StockContainer, Withdrawal};

/// Invariant violations raised by a resource. Any of these aborts the replication it occurs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// A withdrawal asked for more than the container can ever hold, so it could never be satisfied.
    #[error("withdrawal of {requested} exceeds container capacity {capacity}")]
    ExceedsCapacity { requested: u32, capacity: u32 },
    /// A deposit (or an initial level) would push the container above its capacity.
    #[error("depositing {quantity} onto level {level} overflows capacity {capacity}")]
    Overflow { level: u32, quantity: u32, capacity: u32 },
    /// A slot was released while the pool had none in use.
    #[error("released a counter slot that was not held")]
    NotHeld,
}
