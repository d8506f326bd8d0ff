//! First-order decay in a single voxel.
//!
//! A -> 0 with k = 1/s is the textbook SSA case: the population decays
//! exponentially with E[N(t)] = N0 * exp(-k t) and binomial variance
//! N0 * exp(-kt) * (1 - exp(-kt)). The tests pin the statistics, the
//! seed-reproducibility contract, and the step accounting.

mod util;

use tetkin_core::SimRng;
use tetkin_engine::Solver;

fn decay_run(seed: u64, n0: f64, end: f64) -> (f64, u64) {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::decay_model("cyt", 1.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(seed)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    sim.set_comp_count(cyt, a, n0).unwrap();
    sim.run(end).unwrap();
    (sim.comp_count(cyt, a).unwrap(), sim.nsteps())
}

#[test]
fn terminal_count_matches_exponential_mean() {
    // E[N] = 10000 * exp(-1) ~= 3678.8, sigma ~= 48.2; allow 4 sigma.
    let (count, nsteps) = decay_run(1234, 10_000.0, 1.0);
    let expected = 10_000.0 * (-1.0f64).exp();
    assert!(
        (count - expected).abs() < 4.0 * 48.2,
        "terminal count {count}, expected ~{expected}"
    );
    // Every step is one decay event.
    assert_eq!(nsteps, 10_000 - count as u64);
}

#[test]
fn runs_are_bit_reproducible_per_seed() {
    let (a, steps_a) = decay_run(777, 5_000.0, 0.5);
    let (b, steps_b) = decay_run(777, 5_000.0, 0.5);
    assert_eq!(a, b);
    assert_eq!(steps_a, steps_b);
}

#[test]
fn seed_average_matches_long_time_mean() {
    // After 10 half-decades the survivor count is tiny; average the
    // terminal count over many seeds against 10000 * exp(-10).
    let nseeds: u64 = 200;
    let mut total = 0.0;
    for seed in 0..nseeds {
        let (count, _) = decay_run(9000 + seed, 10_000.0, 10.0);
        total += count;
    }
    let mean = total / nseeds as f64;
    let expected = 10_000.0 * (-10.0f64).exp(); // ~0.454
    // Terminal variance ~= mean; standard error of the mean follows.
    let sem = (expected / nseeds as f64).sqrt();
    assert!(
        (mean - expected).abs() < 4.0 * sem,
        "mean {mean}, expected {expected} +- {sem}"
    );
}

#[test]
fn population_exhausts_to_zero() {
    let (count, nsteps) = decay_run(5, 100.0, 1000.0);
    assert_eq!(count, 0.0);
    assert_eq!(nsteps, 100);
}
