/// Errors that may be encountered while executing
/// a simulation.
///
/// The [`BackInTime`] variant originates from the
/// safe interface of the [`EventQueue`] to indicate
/// that an event's scheduled execution time is
/// prior to the queue's current time. This error
/// likely corresponds to a logical bug on the
/// client side, e.g. forgetting to add an offset to
/// the current time when scheduling a new event.
///
/// The [`BadExecution`] variant originates from the
/// events themselves, e.g. a resource invariant that
/// no longer holds, and passes through
/// [`Simulation::run()`] in a type-safe manner.
/// Invoking [`std::error::Error::source()`] on this
/// variant will acquire a shared reference to the
/// wrapped [`std::error::Error`].
///
/// [`EventQueue`]: crate::serial::EventQueue
/// [`Simulation::run()`]: crate::serial::Simulation::run
/// [`BackInTime`]: Error::BackInTime
/// [`BadExecution`]: Error::BadExecution
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The event queue rejected an event that would
    /// have been scheduled for a time that has
    /// already passed.
    #[error("event execution time is less than current simulation time")]
    BackInTime,
    /// An error was encountered while executing an
    /// event. Call [`source()`] or unpack this value
    /// to handle it directly.
    ///
    /// [`source()`]: #method.source
    #[error("error while executing event: {0}")]
    BadExecution(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap any error raised inside an event so it can travel back out of the event loop.
    pub fn bad_execution<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BadExecution(Box::new(error))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::BackInTime, Error::BackInTime) => true,
            (Error::BadExecution(e1), Error::BadExecution(e2)) => {
                let e1: *const dyn std::error::Error = e1.as_ref();
                let e2: *const dyn std::error::Error = e2.as_ref();
                std::ptr::eq(e1, e2)
            },
            _ => false,
        }
    }
}

impl Eq for Error {}

/// [`std::result::Result`]`<(), `[`pharmacy_des::Error`]`>`
///
/// The return type of every event and of the
/// simulation runner.
///
/// [`pharmacy_des::Error`]: Error
pub type Result = std::result::Result<(), Error>;
