//! Reversible isomerisation A ⇌ B: relaxation to the symmetric
//! equilibrium.

mod util;

use tetkin_core::SimRng;
use tetkin_engine::Solver;

#[test]
fn symmetric_rates_split_the_population_evenly() {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(31337)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    let b = sim.statedef().spec_gidx("B").unwrap();

    sim.set_comp_count(cyt, a, 1000.0).unwrap();
    sim.run(1.0).unwrap();

    let na = sim.comp_count(cyt, a).unwrap();
    let nb = sim.comp_count(cyt, b).unwrap();
    assert_eq!(na + nb, 1000.0);
    // Equilibrium sd is sqrt(N)/2 ~= 15.8; allow three.
    assert!((na - 500.0).abs() <= 3.0 * 15.8, "A at equilibrium: {na}");
}

#[test]
fn extents_count_every_firing() {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(99)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    let fwd = sim.statedef().reac_gidx("fwd").unwrap();
    let rev = sim.statedef().reac_gidx("rev").unwrap();

    sim.set_comp_count(cyt, a, 500.0).unwrap();
    sim.advance_steps(1000);

    let ef = sim.comp_reac_extent(cyt, fwd).unwrap();
    let er = sim.comp_reac_extent(cyt, rev).unwrap();
    assert_eq!(ef + er, 1000);
    assert_eq!(sim.nsteps(), 1000);

    sim.reset_comp_reac_extent(cyt, fwd).unwrap();
    assert_eq!(sim.comp_reac_extent(cyt, fwd).unwrap(), 0);
    assert_eq!(sim.comp_reac_extent(cyt, rev).unwrap(), er);
}

/// Doubling the rate constant doubles the reported propensity; the
/// combinatorial part is unaffected.
#[test]
fn propensity_observables_are_consistent() {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(4)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    let fwd = sim.statedef().reac_gidx("fwd").unwrap();

    sim.set_comp_count(cyt, a, 250.0).unwrap();
    let h = sim.comp_reac_h(cyt, fwd).unwrap();
    let c = sim.comp_reac_c(cyt, fwd).unwrap();
    let a_before = sim.comp_reac_a(cyt, fwd).unwrap();
    assert_eq!(h, 250.0);
    assert!((a_before - h * c).abs() <= 1.0e-9 * a_before);

    sim.set_comp_reac_k(cyt, fwd, 20.0).unwrap();
    let a_after = sim.comp_reac_a(cyt, fwd).unwrap();
    assert!((a_after - 2.0 * a_before).abs() <= 1.0e-9 * a_after);
    assert_eq!(sim.comp_reac_h(cyt, fwd).unwrap(), 250.0);
}

/// Deactivating a channel silences it; reactivating restores the
/// propensity.
#[test]
fn inactive_channels_never_fire() {
    let mesh = util::single_tet_mesh("cyt");
    let model = util::reversible_model("cyt", 10.0, 10.0);
    let mut sim = Solver::new(&model, &mesh, SimRng::new(12)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    let b = sim.statedef().spec_gidx("B").unwrap();
    let fwd = sim.statedef().reac_gidx("fwd").unwrap();
    let rev = sim.statedef().reac_gidx("rev").unwrap();

    sim.set_comp_count(cyt, a, 1000.0).unwrap();
    sim.set_comp_reac_active(cyt, rev, false).unwrap();
    assert!(!sim.comp_reac_active(cyt, rev).unwrap());

    sim.run(3.0).unwrap();
    // With the reverse channel off, everything ends up as B.
    assert_eq!(sim.comp_count(cyt, a).unwrap(), 0.0);
    assert_eq!(sim.comp_count(cyt, b).unwrap(), 1000.0);
    assert_eq!(sim.comp_reac_a(cyt, rev).unwrap(), 0.0);

    sim.set_comp_reac_active(cyt, rev, true).unwrap();
    assert!(sim.comp_reac_a(cyt, rev).unwrap() > 0.0);
}
