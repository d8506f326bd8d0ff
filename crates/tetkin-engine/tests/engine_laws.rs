//! Driver-level laws: stepping equivalences, reset, injection
//! statistics, and argument validation.

mod util;

use tetkin_core::{SimError, SimRng, TetIdx};
use tetkin_engine::Solver;
use tetkin_mesh::TetMesh;

fn reversible_sim(seed: u64) -> Solver {
    util::init_logs();
    let mesh = util::single_tet_mesh("cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    Solver::new(&model, &mesh, SimRng::new(seed)).unwrap()
}

/// `advance(d)` is `run(now + d)`: identical trajectories from
/// identical seeds.
#[test]
fn advance_equals_run_to_the_same_time() {
    let mut by_run = reversible_sim(321);
    let mut by_advance = reversible_sim(321);
    let cyt = by_run.statedef().comp_gidx("cyt").unwrap();
    let a = by_run.statedef().spec_gidx("A").unwrap();

    by_run.set_comp_count(cyt, a, 800.0).unwrap();
    by_advance.set_comp_count(cyt, a, 800.0).unwrap();

    by_run.run(0.125).unwrap();
    by_run.run(0.25).unwrap();
    by_advance.advance(0.125).unwrap();
    by_advance.advance(0.125).unwrap();

    assert_eq!(by_run.time(), by_advance.time());
    assert_eq!(by_run.nsteps(), by_advance.nsteps());
    assert_eq!(
        by_run.comp_count(cyt, a).unwrap(),
        by_advance.comp_count(cyt, a).unwrap()
    );
}

/// `advance_steps(n)` fires exactly `n` events while the system is
/// live, and the clock is never clamped.
#[test]
fn advance_steps_counts_events() {
    let mut sim = reversible_sim(55);
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    sim.set_comp_count(cyt, a, 100.0).unwrap();

    sim.advance_steps(250);
    assert_eq!(sim.nsteps(), 250);
    assert!(sim.time() > 0.0);
}

/// Reset followed by re-injection of the same populations restores
/// the initial total propensity.
#[test]
fn reset_and_reinject_restores_a0() {
    // Two equal voxels and an even count: the injection is
    // deterministic, so the propensities match exactly.
    let mesh = util::chain_mesh(2, "cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(1000)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();

    sim.set_comp_count(cyt, a, 1000.0).unwrap();
    let a0_initial = sim.a0();
    assert!(a0_initial > 0.0);

    sim.run(0.5).unwrap();
    sim.reset();
    assert_eq!(sim.a0(), 0.0);
    assert_eq!(sim.comp_count(cyt, a).unwrap(), 0.0);

    sim.set_comp_count(cyt, a, 1000.0).unwrap();
    assert_eq!(sim.a0(), a0_initial);
}

/// Reset restores compartment-default rate constants.
#[test]
fn reset_restores_default_constants() {
    let mut sim = reversible_sim(2);
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let fwd = sim.statedef().reac_gidx("fwd").unwrap();

    sim.set_comp_reac_k(cyt, fwd, 99.0).unwrap();
    assert_eq!(sim.comp_reac_k(cyt, fwd).unwrap(), 99.0);
    sim.reset();
    assert_eq!(sim.comp_reac_k(cyt, fwd).unwrap(), 10.0);
    assert_eq!(sim.tet_reac_k(TetIdx(0), fwd).unwrap(), 10.0);
}

/// Injection over unequal voxels is unbiased: each voxel's expected
/// share is proportional to its volume. The 1:2 ratio makes every
/// per-voxel share fractional, so the probabilistic rounding path is
/// exercised on each trial.
#[test]
fn injection_is_volume_weighted() {
    let mut tet_small = util::lone_tet(util::FEMTOLITRE);
    let mut tet_big = util::lone_tet(2.0 * util::FEMTOLITRE);
    tet_small.neighbours[1] = Some(TetIdx(1));
    tet_big.neighbours[0] = Some(TetIdx(0));
    let mut mesh = TetMesh::new(vec![tet_small, tet_big], vec![]).unwrap();
    mesh.add_compartment("cyt", vec![TetIdx(0), TetIdx(1)]).unwrap();

    let model = util::diffusion_model("cyt", 0.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(654)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();

    let trials = 200;
    let n = 1000.0;
    let mut total_small = 0.0;
    for _ in 0..trials {
        sim.set_comp_count(cyt, x, n).unwrap();
        assert_eq!(sim.comp_count(cyt, x).unwrap(), n);
        total_small += sim.tet_count(TetIdx(0), x).unwrap();
    }
    let mean_small = total_small / f64::from(trials);
    // E = 1000/3; per-trial sd ~14.9, so the mean over 200 trials has
    // sd ~1.05. Allow five.
    assert!(
        (mean_small - 1000.0 / 3.0).abs() < 5.0,
        "mean small-voxel share {mean_small}"
    );
}

#[test]
fn invalid_arguments_are_rejected() {
    let mut sim = reversible_sim(11);
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();

    assert!(matches!(
        sim.advance(-1.0),
        Err(SimError::NegativeValue { .. })
    ));
    sim.run(1.0).unwrap();
    assert!(matches!(
        sim.run(0.5),
        Err(SimError::EndTimeInPast { .. })
    ));
    assert!(matches!(
        sim.set_comp_count(cyt, a, -5.0),
        Err(SimError::NegativeValue { .. })
    ));
    assert!(matches!(
        sim.set_comp_count(cyt, a, 5.0e9),
        Err(SimError::CountTooLarge { .. })
    ));
    assert!(matches!(
        sim.set_tet_vol(TetIdx(0), 1.0),
        Err(SimError::NotImplemented { .. })
    ));

    // Species index out of range, then a tetrahedron outside any
    // compartment region.
    use tetkin_core::SpecGIdx;
    assert!(matches!(
        sim.comp_count(cyt, SpecGIdx(99)),
        Err(SimError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        sim.tet_count(TetIdx(99), a),
        Err(SimError::IndexOutOfRange { .. })
    ));
}

/// A species that exists globally but not in the compartment is an
/// error naming both.
#[test]
fn undefined_species_errors_name_the_offender() {
    let mesh = util::membrane_mesh(util::FEMTOLITRE);
    let model = util::binding_model(1.0e7);
    let sim = Solver::new(&model, &mesh, SimRng::new(0)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let l = sim.statedef().spec_gidx("L").unwrap();

    // L lives in the outer compartment and on nothing else.
    let err = sim.comp_count(cyt, l).unwrap_err();
    assert_eq!(
        err.to_string(),
        "species 'L' is not defined in compartment 'cyt'"
    );
}
