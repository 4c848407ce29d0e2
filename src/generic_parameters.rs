use std::fmt::Debug;

/// The generic type used for a simulation's clock.
///
/// Kept generic so the event queue can run on either a discrete or a continuous clock. This trait is a superset of
/// [`Ord`] and [`Debug`] with no additional requirements or functionality.
///
/// Events execute in ascending order of execution time, i.e. if `A.cmp(&B) == std::cmp::Ordering::Less` then event A
/// will execute before event B. Ties are resolved by the order in which events are enqueued, which makes every run of
/// a [`serial::Simulation`] reproducible.
///
/// Implementations are provided for integral builtin types and for the [`OrderedFloat`] and [`NotNan`] wrappers from
/// [`ordered-float`]. Bare [`f32`] and [`f64`] do not implement [`Ord`] and so cannot be used directly; the pharmacy
/// model measures time in minutes as an [`OrderedFloat<f64>`].
///
/// [`serial::Simulation`]: crate::serial::Simulation
/// [`ordered-float`]: https://docs.rs/ordered-float/4
/// [`OrderedFloat`]: ordered_float::OrderedFloat
/// [`OrderedFloat<f64>`]: ordered_float::OrderedFloat
/// [`NotNan`]: ordered_float::NotNan
pub trait SimTime: Ord + Debug {}

impl SimTime for u8 {}
impl SimTime for u16 {}
impl SimTime for u32 {}
impl SimTime for u64 {}
impl SimTime for u128 {}
impl SimTime for usize {}
impl SimTime for i8 {}
impl SimTime for i16 {}
impl SimTime for i32 {}
impl SimTime for i64 {}
impl SimTime for i128 {}
impl SimTime for isize {}

impl<Float> SimTime for ordered_float::OrderedFloat<Float> where Float: ordered_float::FloatCore + Debug {}

impl<Float> SimTime for ordered_float::NotNan<Float> where Float: ordered_float::FloatCore + Debug {}

/// The generic type used for a simulation's overall state.
///
/// For the pharmacy this is the counter pool, both stock containers, the random streams and the results accumulator.
///
/// This trait has only one method, which provides a way for [`serial::Simulation::run()`] to ask whether it should wrap
/// up event execution. The default implementation of this method will always answer "no," and so a simulation running
/// with the default will continue until the event queue becomes empty or the end time passed to
/// [`serial::Simulation::run_until()`] is reached.
///
/// [`serial::Simulation::run()`]: crate::serial::Simulation::run
/// [`serial::Simulation::run_until()`]: crate::serial::Simulation::run_until
pub trait SimState<Time>
where
    Time: SimTime,
{
    /// Reports whether the simulation has run to completion. This method will be invoked before popping each event off
    /// the queue: `true` indicates that the simulation is finished and that `run()` should break out of its loop,
    /// whereas `false` means that `run()` should continue with the next scheduled event.
    ///
    /// The `current_time` argument will provide shared access to the internally tracked simulation clock.
    // expect that other implementations will make use of the
    // argument even though this one doesn't
    #[allow(unused_variables)]
    fn is_complete(&self, current_time: &Time) -> bool {
        false
    }
}
