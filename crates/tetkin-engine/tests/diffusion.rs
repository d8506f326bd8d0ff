//! Pure diffusion between voxels: equilibration and mass conservation.

mod util;

use tetkin_core::{SimRng, TetIdx};
use tetkin_engine::Solver;

/// Two equal tets, all 1000 molecules start in tet 0. After a few
/// characteristic times the time-averaged split is even, and the total
/// is conserved at every sample.
///
/// With this geometry the per-molecule hop rate is
/// `area * D / (vol * dist) = 1/s`, so the relaxation time of the
/// difference is 0.5 s.
#[test]
fn two_tets_equilibrate_and_conserve_mass() {
    let mesh = util::chain_mesh(2, "cyt");
    let model = util::diffusion_model("cyt", 1.0e-12);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(2024)).unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();

    sim.set_tet_count(TetIdx(0), x, 1000.0).unwrap();
    sim.set_tet_count(TetIdx(1), x, 0.0).unwrap();

    // Burn-in for ten relaxation times, then time-average.
    sim.run(5.0).unwrap();
    let mut sum0 = 0.0;
    let mut sum1 = 0.0;
    let samples = 200;
    for i in 1..=samples {
        sim.run(5.0 + 10.0 * f64::from(i) / f64::from(samples))
            .unwrap();
        let n0 = sim.tet_count(TetIdx(0), x).unwrap();
        let n1 = sim.tet_count(TetIdx(1), x).unwrap();
        assert_eq!(n0 + n1, 1000.0, "mass not conserved at sample {i}");
        sum0 += n0;
        sum1 += n1;
    }
    let avg0 = sum0 / f64::from(samples);
    let avg1 = sum1 / f64::from(samples);
    // Even split within two standard deviations of a 500-mean count.
    assert!(
        (avg0 - avg1).abs() <= 2.0 * 500.0f64.sqrt(),
        "averages {avg0} vs {avg1}"
    );
}

/// The total propensity equals the sum of the per-voxel diffusion
/// propensities, and molecules never leak out of a chain.
#[test]
fn chain_total_propensity_is_sum_of_channels() {
    let n = 5;
    let mesh = util::chain_mesh(n, "cyt");
    let model = util::diffusion_model("cyt", 1.0e-12);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(7)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();
    let dx = sim.statedef().diff_gidx("diff_X").unwrap();

    sim.set_comp_count(cyt, x, 600.0).unwrap();
    sim.advance_steps(500);

    let mut acc = 0.0;
    for t in 0..n {
        acc += sim.tet_diff_a(TetIdx::from(t), dx).unwrap();
    }
    let a0 = sim.a0();
    assert!(
        (a0 - acc).abs() <= 1.0e-9 * a0.max(1.0),
        "a0 {a0} vs summed propensities {acc}"
    );
    assert_eq!(sim.comp_count(cyt, x).unwrap(), 600.0);
}

/// An isolated voxel has zero diffusion propensity no matter the
/// population.
#[test]
fn isolated_voxel_never_diffuses() {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::diffusion_model("cyt", 1.0e-12);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(1)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();

    sim.set_comp_count(cyt, x, 1.0e4).unwrap();
    assert_eq!(sim.a0(), 0.0);
    sim.advance_steps(10);
    assert_eq!(sim.nsteps(), 0);
}
