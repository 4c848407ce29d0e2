use super::{EventQueue, SimState, SimTime};
use std::fmt::Debug;

/// One step of a simulated process.
///
/// Every activity in a model (a customer, the arrival generator, a restock run) is written as a chain of events: each
/// event carries whatever the process needs to continue, does its work when popped, and schedules the event that
/// resumes the process later. A process suspended on a timer is an event sitting in the [`EventQueue`]; a process
/// suspended on a resource is a payload parked in that resource's wait queue until a release or deposit reschedules it.
///
/// Requiring implementors to be [`Debug`] enables printing the full contents of an [`EventQueue`] when necessary.
pub trait Event<State, Time>: Debug
where
    State: SimState<Time>,
    Time: SimTime,
{
    /// Update the simulation according to the specific type of event. Exclusive access is provided to both the
    /// simulation's current state and the event queue, allowing for both mutation of the simulation's state and
    /// scheduling of new events.
    ///
    /// The simulation's clock time, accessible on the `event_queue` parameter, is updated before this method runs.
    ///
    /// # Errors
    ///
    /// Returning an error halts [`Simulation::run()`], which hands the error back unchanged. Domain failures such as a
    /// violated resource invariant should be wrapped with [`Error::bad_execution()`].
    ///
    /// [`Simulation::run()`]: crate::serial::Simulation::run
    /// [`Error::bad_execution()`]: crate::Error::bad_execution
    fn execute(&mut self, simulation_state: &mut State, event_queue: &mut EventQueue<State, Time>) -> crate::Result;
}

/// An [`Event`] that is guaranteed not to return an [`Error`] on execution.
///
/// An implementation of [`Event`] is provided for all implementors of this trait which simply invokes
/// [`OkEvent::execute()`] then returns `Ok(())`.
///
/// [`OkEvent::execute()`]: OkEvent::execute
/// [`Error`]: crate::Error
pub trait OkEvent<State, Time>: Debug
where
    State: SimState<Time>,
    Time: SimTime,
{
    /// Update the simulation according to the specific type of event, without the possibility of failure.
    fn execute(&mut self, simulation_state: &mut State, event_queue: &mut EventQueue<State, Time>);
}

impl<State, Time, OkEventType> Event<State, Time> for OkEventType
where
    State: SimState<Time>,
    Time: SimTime,
    OkEventType: OkEvent<State, Time>,
{
    fn execute(&mut self, simulation_state: &mut State, event_queue: &mut EventQueue<State, Time>) -> crate::Result {
        OkEvent::execute(self, simulation_state, event_queue);
        Ok(())
    }
}
