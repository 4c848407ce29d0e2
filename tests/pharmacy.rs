mod util;

use ordered_float::OrderedFloat;
use pharmacy_des::pharmacy::{Experiment, Medicine, Pharmacy, PharmacyConfig};

fn busy() -> PharmacyConfig {
    PharmacyConfig::default()
        .with_counters(2)
        .with_arrival_rate(2.0)
        .with_stock(40)
        .with_threshold(15)
        .with_check_interval(10.0)
        .with_travel(20.0, 5.0)
}

#[test]
fn same_seed_gives_identical_metrics() {
    let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
    let first = experiment.run(1234, 60.0, 600.0).unwrap();
    let second = experiment.run(1234, 60.0, 600.0).unwrap();
    assert_eq!(first, second);

    let other = experiment.run(1235, 60.0, 600.0).unwrap();
    assert_ne!(first, other, "a different seed should change the outcome");
}

#[test]
fn resources_stay_within_bounds_at_every_event() {
    let config = busy();
    let mut sim = Pharmacy::simulation(&config, 99, 0.0).unwrap();

    // The simulation checks the bounds before each event in debug builds; stepping adds checks from outside.
    let mut time = 0.0;
    while time < 720.0 {
        time += 0.25;
        sim.run_until(OrderedFloat(time)).unwrap();

        let pharmacy = sim.state();
        assert!(pharmacy.within_bounds(), "bounds violated at {time}");
        assert!(pharmacy.counters_in_use() <= config.n_counters, "too many counters in use at {time}");
        for medicine in [Medicine::OverTheCounter, Medicine::Prescription] {
            assert!(pharmacy.stock_level(medicine) <= config.max_stock, "{medicine:?} overflowed at {time}");
        }
    }
    assert!(sim.state().results().reneged > 0, "the busy configuration should see some reneging");
}

#[test]
fn every_customer_is_served_reneged_or_still_queueing() {
    let config = busy();
    let mut sim = Pharmacy::simulation(&config, 5, 0.0).unwrap();
    for end in [100.0, 250.0, 600.0] {
        sim.run_until(OrderedFloat(end)).unwrap();
        let pharmacy = sim.state();
        let results = pharmacy.results();
        assert_eq!(
            results.arrivals,
            results.served() as u64 + results.reneged + pharmacy.counter_queue_len() as u64,
            "customers unaccounted for at {end}"
        );
    }
}

#[test]
fn without_reneging_every_arrival_reaches_a_counter() {
    let config = PharmacyConfig::default()
        .with_counters(50)
        .with_unlimited_patience()
        .with_stock(5_000);
    let experiment = Experiment::new(config).unwrap();
    let results = experiment.simulate(8, 0.0, 1_000.0).unwrap();

    assert_eq!(0, results.reneged);
    assert!(results.arrivals > 1_000);
    assert_eq!(results.arrivals, results.served() as u64);
}

#[test]
fn warmup_discards_observations_made_before_it() {
    let config = busy();
    let mut sim = Pharmacy::simulation(&config, 17, 30.0).unwrap();

    sim.run_until(OrderedFloat(30.0)).unwrap();
    assert!(sim.state().results().arrivals > 0);
    assert!(!sim.state().results().queue_waiting_times.is_empty());

    sim.run_until(OrderedFloat(30.0 + 1e-9)).unwrap();
    let results = sim.state().results();
    assert_eq!(0, results.arrivals);
    assert!(results.queue_waiting_times.is_empty());
    assert_eq!(0.0, results.total_service_time);
}

#[test]
fn single_counter_at_half_load() {
    let config = PharmacyConfig::default()
        .with_counters(1)
        .with_arrival_rate(0.1)
        .with_service_time(5.0, 0.0)
        .with_unlimited_patience();
    let table = Experiment::new(config).unwrap().run_replications(200, 0.0, 100.0).unwrap();

    assert!(table.rows().iter().all(|row| row.metrics.reneging_rate == 0.0));
    let utilization = table.means().counter_util;
    assert!((40.0..55.0).contains(&utilization), "utilization was {utilization}");
}

fn empty_shelves(choice_p: f64) -> PharmacyConfig {
    PharmacyConfig::default()
        .with_initial_stock(0)
        .with_threshold(0)
        .with_travel(30.0, 0.0)
        .with_unlimited_patience()
        .with_prescription_probability(choice_p)
}

#[test]
fn empty_shelves_block_service_until_the_first_delivery() {
    let config = empty_shelves(0.0);
    let mut sim = Pharmacy::simulation(&config, 3, 0.0).unwrap();

    sim.run_until(OrderedFloat(29.99)).unwrap();
    let pharmacy = sim.state();
    assert_eq!(0, pharmacy.results().completed);
    assert!(pharmacy.results().stock_waiting_times.is_empty());
    assert_eq!(config.n_counters, pharmacy.stock_queue_len(Medicine::OverTheCounter));
    assert_eq!(config.n_counters, pharmacy.counters_in_use());

    sim.run_until(OrderedFloat(30.01)).unwrap();
    let results = sim.state().results();
    assert_eq!(config.n_counters, results.stock_waiting_times.len());
    assert!(results.stock_waiting_times.iter().all(|wait| *wait > 0.0 && *wait < 30.0));
    assert_eq!(0, sim.state().stock_queue_len(Medicine::OverTheCounter));
}

#[test]
fn only_one_category_is_restocked_per_cycle() {
    // Over-the-counter is ordered at t = 0 and arrives at 30; prescriptions are only ordered at the next check, 60.
    let config = empty_shelves(1.0);
    let mut sim = Pharmacy::simulation(&config, 3, 0.0).unwrap();

    sim.run_until(OrderedFloat(89.99)).unwrap();
    assert_eq!(config.max_stock, sim.state().stock_level(Medicine::OverTheCounter));
    assert_eq!(0, sim.state().stock_level(Medicine::Prescription));
    assert_eq!(0, sim.state().results().completed);

    sim.run_until(OrderedFloat(90.01)).unwrap();
    assert_eq!(config.n_counters, sim.state().results().stock_waiting_times.len());
    assert!(sim.state().stock_level(Medicine::Prescription) > 0);
}

#[test]
fn replication_table_is_numbered_and_reproducible() {
    let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
    let table = experiment.run_replications(5, 30.0, 300.0).unwrap();

    assert_eq!(5, table.len());
    assert_eq!(vec![1, 2, 3, 4, 5], table.rows().iter().map(|row| row.replication).collect::<Vec<_>>());
    assert_eq!(table, experiment.run_replications(5, 30.0, 300.0).unwrap());

    let first = table.rows()[0].metrics;
    assert!(table.rows()[1..].iter().any(|row| row.metrics != first));

    let second = experiment.run(experiment.replication_seed(1), 30.0, 300.0).unwrap();
    assert_eq!(second, table.rows()[1].metrics);
}

#[test]
fn table_means_average_the_rows() {
    let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
    let table = experiment.run_replications(4, 30.0, 300.0).unwrap();
    let by_hand = table.rows().iter().map(|row| row.metrics.counter_util).sum::<f64>() / 4.0;
    assert_floats_near_equal!(by_hand, table.means().counter_util, "mean utilization");
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_replications_match_sequential_ones() {
    let experiment = Experiment::new(busy()).unwrap();
    let sequential = experiment.run_replications(8, 30.0, 300.0).unwrap();
    let parallel = experiment.run_replications_parallel(8, 30.0, 300.0).unwrap();
    assert_eq!(sequential, parallel);
}
