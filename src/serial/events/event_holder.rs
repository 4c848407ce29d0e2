use super::Event;
use crate::{SimState, SimTime};
use std::cmp::Ordering;

/// Heap entry wrapping a scheduled event with its sort key: execution time first, then insertion sequence.
///
/// The sequence number is only ever consulted when two events share an execution time, giving first-scheduled,
/// first-run semantics for ties.
#[derive(Debug)]
pub(super) struct EventHolder<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    pub execution_time: Time,
    pub event: Box<dyn Event<State, Time>>,
    pub insertion_sequence: usize,
}

impl<State, Time> PartialEq<Self> for EventHolder<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<State, Time> Eq for EventHolder<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
}

impl<State, Time> PartialOrd<Self> for EventHolder<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<State, Time> Ord for EventHolder<State, Time>
where
    State: SimState<Time>,
    Time: SimTime,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.execution_time
            .cmp(&other.execution_time)
            .then_with(|| self.insertion_sequence.cmp(&other.insertion_sequence))
    }
}
