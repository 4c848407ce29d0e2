use super::{Event, EventQueue};
use crate::{SimState, SimTime};

use std::fmt::Formatter;
use std::ops::Add;

/// Contains the event queue and other state belonging to a simulation.
///
/// A [`Simulation`] owns both its state and its event queue, providing both shared and mutable access to each so
/// clients can set up and tear down instances as needed - for example, scheduling initial events or reading the
/// accumulated results once the run is over.
///
/// The expected workflow for a Simulation is:
///
/// 1. Initialize a struct that implements [`SimState`].
/// 2. Pass this struct and the start time to [`new()`].
/// 3. Schedule at least one initial event.
/// 4. Call [`run()`] or [`run_until()`]. Handle any error it might return.
/// 5. Use the [`state()`] or [`state_mut()`] accessors to finish processing the results.
///
/// [`new()`]: Simulation::new
/// [`run()`]: Simulation::run
/// [`run_until()`]: Simulation::run_until
/// [`state()`]: Simulation::state
/// [`state_mut()`]: Simulation::state_mut
#[derive(Debug, Default)]
pub struct Simulation<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    /// A priority queue of events that have been scheduled to execute, ordered ascending by execution time.
    event_queue: EventQueue<State, Time>,
    /// The current shared state of the Simulation. Exclusive access will be granted to each event that executes.
    state: State,
}

impl<State, Time> Simulation<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    /// Initialize a Simulation instance with the provided starting state and an event queue with clock set to the
    /// provided starting time.
    pub fn new(initial_state: State, start_time: Time) -> Self {
        Self {
            event_queue: EventQueue::new(start_time),
            state: initial_state,
        }
    }

    /// Execute events from the priority queue, one at a time, in ascending order by execution time.
    ///
    /// Follows this loop:
    ///
    /// 1. Does [`state.is_complete()`] return true? If so, return `Ok(())`.
    /// 2. Attempt to pop the next event from the queue. If there isn't one, return `Ok(())`.
    /// 3. Pass exclusive references to the state and event queue to [`event.execute()`].
    ///     1. If an error is returned, forward it as-is to the caller.
    ///     2. Otherwise, go back to step 1.
    ///
    /// # Errors
    ///
    /// Errors raised by events are passed back to the caller unchanged. [`Error::BackInTime`] means an event tried to
    /// schedule a successor in the past; [`Error::BadExecution`] wraps a domain error raised inside an event.
    ///
    /// [`state.is_complete()`]: SimState::is_complete
    /// [`event.execute()`]: Event::execute
    /// [`Error::BackInTime`]: crate::Error::BackInTime
    /// [`Error::BadExecution`]: crate::Error::BadExecution
    pub fn run(&mut self) -> crate::Result {
        loop {
            if self.state.is_complete(self.event_queue.current_time()) {
                return Ok(());
            }

            match self.event_queue.next() {
                Some(mut next_event) => next_event.execute(&mut self.state, &mut self.event_queue)?,
                None => return Ok(()),
            }
        }
    }

    /// Execute events in order until the next one is due at or after `end_time`, then move the clock to `end_time`.
    ///
    /// Events scheduled at exactly `end_time` or later stay on the queue unexecuted, so any process suspended past
    /// the horizon is simply abandoned. Calling this again with a later end time resumes where the previous call left
    /// off, which lets callers inspect the state at chosen instants.
    ///
    /// # Errors
    ///
    /// Same as [`run()`](Simulation::run).
    pub fn run_until(&mut self, end_time: Time) -> crate::Result {
        loop {
            if self.state.is_complete(self.event_queue.current_time()) {
                break;
            }

            match self.event_queue.peek_time() {
                Some(next_time) if *next_time < end_time => {},
                _ => break,
            }

            if let Some(mut next_event) = self.event_queue.next() {
                next_event.execute(&mut self.state, &mut self.event_queue)?;
            }
        }

        self.event_queue.advance_to(end_time);
        Ok(())
    }

    /// Schedule the provided event at the specified time.
    ///
    /// # Errors
    ///
    /// If `time` is less than the current clock time on `self`, returns an [`Error::BackInTime`] to indicate the likely
    /// presence of a logical bug at the call site, with no modifications to the queue.
    ///
    /// [`Error::BackInTime`]: crate::Error::BackInTime
    pub fn schedule<EventType>(&mut self, event: EventType, time: Time) -> crate::Result
    where
        EventType: Event<State, Time> + 'static,
    {
        self.event_queue.schedule(event, time)
    }

    /// Get a shared reference to the simulation state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Get an exclusive reference to the simulation state.
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Get a shared reference to the event queue.
    pub fn event_queue(&self) -> &EventQueue<State, Time> {
        &self.event_queue
    }

    /// Get an exclusive reference to the event queue.
    pub fn event_queue_mut(&mut self) -> &mut EventQueue<State, Time> {
        &mut self.event_queue
    }

    /// Split the simulation into exclusive references to its state and its queue, the same pair an executing event
    /// receives. Used to schedule a model's initial events with the model's own helpers.
    pub fn parts_mut(&mut self) -> (&mut State, &mut EventQueue<State, Time>) {
        (&mut self.state, &mut self.event_queue)
    }

    /// Consume the simulation, keeping only its final state.
    pub fn into_state(self) -> State {
        self.state
    }
}

impl<State, Time> Simulation<State, Time>
where
    State: SimState<Time>,
    Time: SimTime + Clone + Add<Output = Time>,
{
    /// Schedule the provided event after the specified delay. The event's execution time will be equal to the result of
    /// `self.current_time().clone() + delay`.
    ///
    /// # Errors
    ///
    /// If the calculated execution time is less than the current clock time on `self`, returns an [`Error::BackInTime`]
    /// to indicate the likely presence of a logical bug at the call site, with no modifications to the queue.
    ///
    /// [`Error::BackInTime`]: crate::Error::BackInTime
    pub fn schedule_with_delay<EventType>(&mut self, event: EventType, delay: Time) -> crate::Result
    where
        EventType: Event<State, Time> + 'static,
    {
        self.event_queue.schedule_with_delay(event, delay)
    }
}

impl<State, Time> std::fmt::Display for Simulation<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Simulation at time {:?}", self.event_queue.current_time())
    }
}
