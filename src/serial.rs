//! Single-threaded event queue and runner. Exactly one event executes at any simulated instant.

mod events;
mod simulation;

pub use events::event_traits::{Event, OkEvent};
pub use events::EventQueue;
pub use simulation::Simulation;
