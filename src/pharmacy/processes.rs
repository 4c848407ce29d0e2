//! The pharmacy's processes, written as chains of events.
//!
//! * The arrival generator is a [`CustomerArrival`] that reschedules itself after every arrival.
//! * A customer queues for a counter, racing a [`PatienceExpired`] timer, then withdraws stock and is served. While it
//!   waits for a counter it is parked in the [`CounterPool`]; while it waits for stock it is parked in a
//!   [`StockContainer`] together with the slot it holds.
//! * The restock monitor is a [`RestockCheck`] that either orders a [`RestockDelivery`] and waits for it, or waits out
//!   the check interval.
//! * The warmup controller is a single [`WarmupComplete`] event.

use super::config::PharmacyConfig;
use super::results::Results;
use crate::resources::{CounterPool, CounterSlot, Request, ResourceError, StockContainer, Ticket, Withdrawal};
use crate::sampling::{self, Patience, Sampler, SamplingError};
use crate::serial::{Event, EventQueue, OkEvent, Simulation};
use crate::{Error, SimState};

use ordered_float::OrderedFloat;
use rand::distr::{Bernoulli, Uniform};
use rand_distr::{Exp, LogNormal};
use tracing::{debug, trace};

/// Simulation clock, in minutes.
pub type Minutes = OrderedFloat<f64>;

/// The two categories of medicine, each stocked in its own container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medicine {
    OverTheCounter,
    Prescription,
}

/// What a customer came to buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedicineOrder {
    pub medicine: Medicine,
    pub quantity: u32,
}

/// The independent random streams of a replication, by stream index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomStream {
    Arrivals = 0,
    ServiceTime = 1,
    Patience = 2,
    MedicineType = 3,
    Quantity = 4,
    TravelNoise = 5,
}

impl RandomStream {
    fn index(self) -> u64 {
        self as u64
    }
}

#[derive(Debug)]
struct Samplers {
    arrivals: Sampler<Exp<f64>>,
    service: Sampler<LogNormal<f64>>,
    patience: Sampler<Patience>,
    medicine: Sampler<Bernoulli>,
    quantity: Sampler<Uniform<u32>>,
    travel_noise: Sampler<Uniform<f64>>,
}

impl Samplers {
    fn new(config: &PharmacyConfig, seed: u64) -> Result<Self, SamplingError> {
        let stream = |which: RandomStream| sampling::new_stream(seed, which.index());
        Ok(Self {
            arrivals: Sampler::new(sampling::exponential(config.arrival_lambda)?, stream(RandomStream::Arrivals)),
            service: Sampler::new(
                sampling::lognormal_from_moments(config.service_mean, config.service_stdev)?,
                stream(RandomStream::ServiceTime),
            ),
            patience: Sampler::new(
                Patience::new(config.patience_shape, config.patience_scale)?,
                stream(RandomStream::Patience),
            ),
            medicine: Sampler::new(sampling::bernoulli(config.choice_p)?, stream(RandomStream::MedicineType)),
            quantity: Sampler::new(
                sampling::uniform_integer(config.choice_low, config.choice_high)?,
                stream(RandomStream::Quantity),
            ),
            travel_noise: Sampler::new(
                sampling::symmetric_noise(config.travel_noise)?,
                stream(RandomStream::TravelNoise),
            ),
        })
    }
}

/// The model could not be assembled for a replication.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

#[derive(Debug)]
struct Customer {
    id: u64,
    patience: f64,
    order: MedicineOrder,
    queued_at: f64,
}

/// A customer holding a counter slot, waiting for or receiving service.
#[derive(Debug)]
struct AtCounter {
    customer: Customer,
    slot: CounterSlot,
    reached_counter_at: f64,
}

/// State of one replication: the shared resources, the random streams and the results accumulator.
#[derive(Debug)]
pub struct Pharmacy {
    config: PharmacyConfig,
    counters: CounterPool<Customer>,
    otc_stock: StockContainer<AtCounter>,
    prescription_stock: StockContainer<AtCounter>,
    samplers: Samplers,
    results: Results,
    next_customer: u64,
}

impl SimState<Minutes> for Pharmacy {
    /// Never ends a run early. Debug builds check the resource bounds here, before every event.
    fn is_complete(&self, current_time: &Minutes) -> bool {
        debug_assert!(self.within_bounds(), "resource bounds violated at {current_time:?}: {self:?}");
        false
    }
}

impl Pharmacy {
    /// Fresh resources and random streams for one replication seeded with `seed`.
    ///
    /// # Errors
    ///
    /// [`ModelError`] if a distribution or container cannot be built from `config`. A validated config never fails.
    pub fn new(config: &PharmacyConfig, seed: u64) -> Result<Self, ModelError> {
        Ok(Self {
            config: config.clone(),
            counters: CounterPool::new(config.n_counters),
            otc_stock: StockContainer::new(config.starting_stock(), config.max_stock)?,
            prescription_stock: StockContainer::new(config.starting_stock(), config.max_stock)?,
            samplers: Samplers::new(config, seed)?,
            results: Results::default(),
            next_customer: 1,
        })
    }

    /// Build a replication at time zero with every process started: the arrival generator, the restock monitor and
    /// the warmup controller, which resets the results at `warmup`.
    ///
    /// # Errors
    ///
    /// [`ModelError`] as for [`Pharmacy::new()`], wrapped in [`Error::BadExecution`], or [`Error::BackInTime`] for a
    /// negative warmup.
    pub fn simulation(config: &PharmacyConfig, seed: u64, warmup: f64) -> Result<Simulation<Self, Minutes>, Error> {
        let pharmacy = Self::new(config, seed).map_err(Error::bad_execution)?;
        let mut sim = Simulation::new(pharmacy, OrderedFloat(0.0));

        let (state, queue) = sim.parts_mut();
        CustomerArrival::schedule(state, queue)?;
        queue.schedule_now(RestockCheck {})?;
        queue.schedule(WarmupComplete {}, OrderedFloat(warmup))?;
        Ok(sim)
    }

    pub fn config(&self) -> &PharmacyConfig {
        &self.config
    }

    /// Observations since the last warmup reset.
    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn into_results(self) -> Results {
        self.results
    }

    /// Number of counters currently serving or waiting on stock.
    pub fn counters_in_use(&self) -> usize {
        self.counters.in_use()
    }

    /// Number of customers queueing for a counter.
    pub fn counter_queue_len(&self) -> usize {
        self.counters.queue_len()
    }

    /// Whether every counter pool and container is within its capacity.
    pub fn within_bounds(&self) -> bool {
        self.counters.in_use() <= self.counters.capacity()
            && [&self.otc_stock, &self.prescription_stock]
                .iter()
                .all(|stock| stock.level() <= stock.capacity())
    }

    /// Units of `medicine` on the shelf.
    pub fn stock_level(&self, medicine: Medicine) -> u32 {
        self.stock(medicine).level()
    }

    /// Number of customers at a counter waiting for `medicine` to be restocked.
    pub fn stock_queue_len(&self, medicine: Medicine) -> usize {
        self.stock(medicine).queue_len()
    }

    fn stock(&self, medicine: Medicine) -> &StockContainer<AtCounter> {
        match medicine {
            Medicine::OverTheCounter => &self.otc_stock,
            Medicine::Prescription => &self.prescription_stock,
        }
    }

    fn stock_mut(&mut self, medicine: Medicine) -> &mut StockContainer<AtCounter> {
        match medicine {
            Medicine::OverTheCounter => &mut self.otc_stock,
            Medicine::Prescription => &mut self.prescription_stock,
        }
    }

    fn new_customer(&mut self, now: f64) -> Customer {
        let id = self.next_customer;
        self.next_customer += 1;

        let patience: f64 = self.samplers.patience.sample();
        let medicine = if self.samplers.medicine.sample::<bool>() {
            Medicine::Prescription
        } else {
            Medicine::OverTheCounter
        };
        let quantity: u32 = self.samplers.quantity.sample();

        Customer {
            id,
            patience,
            order: MedicineOrder { medicine, quantity },
            queued_at: now,
        }
    }

    /// The category to restock this cycle, if any. Over-the-counter stock is checked first and wins when both are low.
    fn restock_due(&self) -> Option<Medicine> {
        [Medicine::OverTheCounter, Medicine::Prescription]
            .into_iter()
            .find(|medicine| self.stock_level(*medicine) <= self.config.med_thresh)
    }
}

fn now(event_queue: &EventQueue<Pharmacy, Minutes>) -> f64 {
    event_queue.current_time().0
}

/// A customer walks in. Spawns the customer, then waits for the next arrival.
#[derive(Debug)]
struct CustomerArrival {}

impl CustomerArrival {
    fn schedule(pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        let delay: f64 = pharmacy.samplers.arrivals.sample();
        event_queue.schedule_with_delay(Self {}, OrderedFloat(delay))
    }
}

impl Event<Pharmacy, Minutes> for CustomerArrival {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        pharmacy.results.arrivals += 1;
        let customer = pharmacy.new_customer(now(event_queue));
        trace!(
            customer = customer.id,
            time = now(event_queue),
            order = ?customer.order,
            "customer arrived"
        );

        queue_for_counter(customer, pharmacy, event_queue)?;
        Self::schedule(pharmacy, event_queue)
    }
}

/// Request a counter, racing the request against the customer's patience.
fn queue_for_counter(
    customer: Customer,
    pharmacy: &mut Pharmacy,
    event_queue: &mut EventQueue<Pharmacy, Minutes>,
) -> crate::Result {
    let patience = customer.patience;
    match pharmacy.counters.request(customer) {
        Request::Granted(slot, customer) => reach_counter(customer, slot, pharmacy, event_queue),
        Request::Queued(ticket) if patience.is_finite() => {
            event_queue.schedule_with_delay(PatienceExpired { ticket }, OrderedFloat(patience))
        },
        Request::Queued(_) => Ok(()),
    }
}

/// Customer holds a counter: record the queueing time and ask for stock.
fn reach_counter(
    customer: Customer,
    slot: CounterSlot,
    pharmacy: &mut Pharmacy,
    event_queue: &mut EventQueue<Pharmacy, Minutes>,
) -> crate::Result {
    let now = now(event_queue);
    let waited = now - customer.queued_at;
    pharmacy.results.queue_waiting_times.push(waited);
    trace!(customer = customer.id, time = now, waited, "customer reached a counter");

    let MedicineOrder { medicine, quantity } = customer.order;
    let at_counter = AtCounter {
        customer,
        slot,
        reached_counter_at: now,
    };
    match pharmacy
        .stock_mut(medicine)
        .withdraw(quantity, at_counter)
        .map_err(Error::bad_execution)?
    {
        Withdrawal::Complete(at_counter) => start_service(at_counter, pharmacy, event_queue),
        Withdrawal::Pending => {
            trace!(time = now, ?medicine, quantity, "customer waiting for stock");
            Ok(())
        },
    }
}

/// Stock is in hand: draw a service duration and wait it out.
fn start_service(
    at_counter: AtCounter,
    pharmacy: &mut Pharmacy,
    event_queue: &mut EventQueue<Pharmacy, Minutes>,
) -> crate::Result {
    pharmacy
        .results
        .stock_waiting_times
        .push(now(event_queue) - at_counter.reached_counter_at);

    let duration: f64 = pharmacy.samplers.service.sample();
    event_queue.schedule_with_delay(
        ServiceComplete {
            at_counter: Some(at_counter),
            duration,
        },
        OrderedFloat(duration),
    )
}

/// The customer's patience ran out. Only takes effect if the customer is still queueing.
#[derive(Debug)]
struct PatienceExpired {
    ticket: Ticket,
}

impl OkEvent<Pharmacy, Minutes> for PatienceExpired {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) {
        if let Some(customer) = pharmacy.counters.cancel(self.ticket) {
            pharmacy.results.reneged += 1;
            trace!(
                customer = customer.id,
                time = now(event_queue),
                waited = now(event_queue) - customer.queued_at,
                "customer reneged"
            );
        }
    }
}

/// A released counter was passed to a queueing customer; resume that customer.
#[derive(Debug)]
struct CounterGranted {
    grant: Option<(Customer, CounterSlot)>,
}

impl Event<Pharmacy, Minutes> for CounterGranted {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        match self.grant.take() {
            Some((customer, slot)) => reach_counter(customer, slot, pharmacy, event_queue),
            None => Ok(()),
        }
    }
}

/// A restock covered a waiting withdrawal; resume that customer's service.
#[derive(Debug)]
struct StockReceived {
    at_counter: Option<AtCounter>,
}

impl Event<Pharmacy, Minutes> for StockReceived {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        match self.at_counter.take() {
            Some(at_counter) => start_service(at_counter, pharmacy, event_queue),
            None => Ok(()),
        }
    }
}

/// Service finished: account for it and hand the counter on.
#[derive(Debug)]
struct ServiceComplete {
    at_counter: Option<AtCounter>,
    duration: f64,
}

impl Event<Pharmacy, Minutes> for ServiceComplete {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        let Some(AtCounter { customer, slot, .. }) = self.at_counter.take() else {
            return Ok(());
        };

        pharmacy.results.total_service_time += self.duration;
        pharmacy.results.completed += 1;
        trace!(
            customer = customer.id,
            time = now(event_queue),
            duration = self.duration,
            "customer served"
        );

        match pharmacy.counters.release(slot).map_err(Error::bad_execution)? {
            Some((slot, next)) => event_queue.schedule_now(CounterGranted {
                grant: Some((next, slot)),
            }),
            None => Ok(()),
        }
    }
}

/// One cycle of the restock monitor.
#[derive(Debug)]
struct RestockCheck {}

impl RestockCheck {
    fn schedule_next(pharmacy: &Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        event_queue.schedule_with_delay(Self {}, OrderedFloat(pharmacy.config.restock_check_interval))
    }
}

impl Event<Pharmacy, Minutes> for RestockCheck {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        let Some(medicine) = pharmacy.restock_due() else {
            return Self::schedule_next(pharmacy, event_queue);
        };

        let stock = pharmacy.stock(medicine);
        let quantity = stock.capacity() - stock.level();
        let noise: f64 = pharmacy.samplers.travel_noise.sample();
        let travel_time = pharmacy.config.travel_time + noise;
        debug!(time = now(event_queue), ?medicine, quantity, travel_time, "restock ordered");

        event_queue.schedule_with_delay(RestockDelivery { medicine, quantity }, OrderedFloat(travel_time))
    }
}

/// A restock arrives. The monitor resumes its cycle once the stock is on the shelf.
#[derive(Debug)]
struct RestockDelivery {
    medicine: Medicine,
    quantity: u32,
}

impl Event<Pharmacy, Minutes> for RestockDelivery {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
        let served = pharmacy
            .stock_mut(self.medicine)
            .deposit(self.quantity)
            .map_err(Error::bad_execution)?;
        debug!(
            time = now(event_queue),
            medicine = ?self.medicine,
            quantity = self.quantity,
            waiting_served = served.len(),
            "restock delivered"
        );

        for at_counter in served {
            event_queue.schedule_now(StockReceived {
                at_counter: Some(at_counter),
            })?;
        }
        RestockCheck::schedule_next(pharmacy, event_queue)
    }
}

/// End of the warmup period: discard everything observed so far. Resources and in-flight customers are untouched.
#[derive(Debug)]
struct WarmupComplete {}

impl OkEvent<Pharmacy, Minutes> for WarmupComplete {
    fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) {
        debug!(time = now(event_queue), "warmup complete");
        pharmacy.results = Results::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> PharmacyConfig {
        PharmacyConfig::default()
            .with_unlimited_patience()
            .with_stock(1_000)
            .with_threshold(0)
    }

    /// Hand-build a customer and push them into the pharmacy at the current time.
    #[derive(Debug)]
    struct Walkin {
        patience: f64,
        order: MedicineOrder,
    }

    impl Event<Pharmacy, Minutes> for Walkin {
        fn execute(&mut self, pharmacy: &mut Pharmacy, event_queue: &mut EventQueue<Pharmacy, Minutes>) -> crate::Result {
            pharmacy.results.arrivals += 1;
            let customer = Customer {
                id: 0,
                patience: self.patience,
                order: self.order,
                queued_at: now(event_queue),
            };
            queue_for_counter(customer, pharmacy, event_queue)
        }
    }

    /// A pharmacy with no background processes, for driving customers by hand.
    fn bare(config: &PharmacyConfig) -> Simulation<Pharmacy, Minutes> {
        Simulation::new(Pharmacy::new(config, 7).unwrap(), OrderedFloat(0.0))
    }

    fn order(quantity: u32) -> MedicineOrder {
        MedicineOrder {
            medicine: Medicine::OverTheCounter,
            quantity,
        }
    }

    #[test]
    fn restock_prefers_over_the_counter() {
        let mut pharmacy = Pharmacy::new(&PharmacyConfig::default().with_initial_stock(50), 1).unwrap();
        assert_eq!(Some(Medicine::OverTheCounter), pharmacy.restock_due());

        pharmacy.otc_stock.deposit(200).unwrap();
        assert_eq!(Some(Medicine::Prescription), pharmacy.restock_due());

        pharmacy.prescription_stock.deposit(200).unwrap();
        assert_eq!(None, pharmacy.restock_due());
    }

    #[test]
    fn bounds_are_checked_before_every_event_without_ending_the_run() {
        let config = PharmacyConfig::default()
            .with_counters(1)
            .with_arrival_rate(3.0)
            .with_stock(20)
            .with_threshold(5);
        let mut sim = Pharmacy::simulation(&config, 11, 0.0).unwrap();
        assert!(!sim.state().is_complete(&OrderedFloat(0.0)));

        sim.run_until(OrderedFloat(300.0)).unwrap();
        assert!(sim.state().within_bounds());
        assert_eq!(OrderedFloat(300.0), *sim.event_queue().current_time());
        assert!(sim.state().results().arrivals > 0);
    }

    #[test]
    fn impatient_customer_reneges_exactly_once() {
        let config = quiet().with_counters(1).with_service_time(10.0, 0.0);
        let mut sim = bare(&config);
        sim.schedule(Walkin { patience: f64::INFINITY, order: order(1) }, OrderedFloat(0.0)).unwrap();
        sim.schedule(Walkin { patience: 5.0, order: order(1) }, OrderedFloat(0.0)).unwrap();
        sim.run().unwrap();

        let results = sim.state().results();
        assert_eq!(1, results.reneged);
        assert_eq!(vec![0.0], results.queue_waiting_times, "the impatient customer must never be served");
        assert_eq!(1, results.completed);
        assert_eq!(0, sim.state().counters_in_use());
    }

    #[test]
    fn patient_customer_is_granted_the_released_counter() {
        let config = quiet().with_counters(1).with_service_time(10.0, 0.0);
        let mut sim = bare(&config);
        sim.schedule(Walkin { patience: f64::INFINITY, order: order(1) }, OrderedFloat(0.0)).unwrap();
        sim.schedule(Walkin { patience: 15.0, order: order(1) }, OrderedFloat(0.0)).unwrap();
        sim.run().unwrap();

        let results = sim.state().results();
        assert_eq!(0, results.reneged);
        assert_eq!(2, results.completed);
        assert_eq!(2, results.queue_waiting_times.len());
        assert!((results.queue_waiting_times[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn customer_waits_at_counter_for_stock() {
        let config = quiet().with_counters(2).with_service_time(1.0, 0.0).with_initial_stock(0);
        let mut sim = bare(&config);
        sim.schedule(Walkin { patience: 1.0, order: order(2) }, OrderedFloat(0.0)).unwrap();
        sim.schedule(RestockDelivery { medicine: Medicine::OverTheCounter, quantity: 5 }, OrderedFloat(4.0))
            .unwrap();
        sim.run_until(OrderedFloat(3.0)).unwrap();

        assert_eq!(1, sim.state().counters_in_use(), "counter stays held while waiting for stock");
        assert_eq!(1, sim.state().stock_queue_len(Medicine::OverTheCounter));
        assert_eq!(0, sim.state().results().reneged, "patience does not apply at the counter");

        sim.run_until(OrderedFloat(4.5)).unwrap();
        assert_eq!(3, sim.state().stock_level(Medicine::OverTheCounter));
        assert_eq!(vec![4.0], sim.state().results().stock_waiting_times);
    }

    #[test]
    fn oversized_order_aborts_the_run() {
        let config = quiet().with_stock(3);
        let mut sim = bare(&config);
        sim.schedule(Walkin { patience: 1.0, order: order(4) }, OrderedFloat(0.0)).unwrap();
        match sim.run() {
            Err(Error::BadExecution(source)) => {
                assert!(source.to_string().contains("exceeds container capacity"), "{source}")
            },
            other => panic!("expected a resource error, got {other:?}"),
        }
    }

    #[test]
    fn warmup_discards_earlier_observations_only() {
        let config = quiet().with_counters(1).with_service_time(10.0, 0.0);
        let mut sim = bare(&config);
        sim.schedule(Walkin { patience: f64::INFINITY, order: order(1) }, OrderedFloat(0.0)).unwrap();
        sim.schedule(Walkin { patience: f64::INFINITY, order: order(1) }, OrderedFloat(1.0)).unwrap();
        sim.schedule(WarmupComplete {}, OrderedFloat(5.0)).unwrap();
        sim.run().unwrap();

        let results = sim.state().results();
        assert_eq!(0, results.arrivals);
        assert_eq!(1, results.queue_waiting_times.len(), "only the second customer reaches a counter after warmup");
        assert!((results.queue_waiting_times[0] - 9.0).abs() < 1e-9, "waited {:?}", results.queue_waiting_times);
        assert_eq!(2, results.completed);
        assert_eq!(998, sim.state().stock_level(Medicine::OverTheCounter));
    }
}
