//! Species-selective gating across a diffusion boundary.

mod util;

use tetkin_core::SimRng;
use tetkin_engine::Solver;

fn gated_sim(seed: u64) -> Solver {
    Solver::new(&util::gated_model(1.0e-12), &util::boundary_mesh(), SimRng::new(seed)).unwrap()
}

#[test]
fn boundary_blocks_until_enabled_and_stays_selective() {
    let mut sim = gated_sim(77);
    let side_a = sim.statedef().comp_gidx("side_a").unwrap();
    let side_b = sim.statedef().comp_gidx("side_b").unwrap();
    let gate = sim.statedef().diff_bnd_gidx("gate").unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();
    let y = sim.statedef().spec_gidx("Y").unwrap();

    sim.set_comp_count(side_a, x, 1000.0).unwrap();
    sim.set_comp_count(side_a, y, 1000.0).unwrap();

    // Both species are walled in: the only faces are boundary faces,
    // so nothing can move at all.
    assert!(!sim.diff_bnd_active(gate, x).unwrap());
    sim.run(0.01).unwrap();
    assert_eq!(sim.comp_count(side_b, x).unwrap(), 0.0);
    assert_eq!(sim.comp_count(side_b, y).unwrap(), 0.0);

    // Open the gate for X only.
    sim.set_diff_bnd_active(gate, x, true).unwrap();
    assert!(sim.diff_bnd_active(gate, x).unwrap());
    assert!(!sim.diff_bnd_active(gate, y).unwrap());

    sim.run(0.1).unwrap();
    let xb = sim.comp_count(side_b, x).unwrap();
    assert!(xb > 0.0, "X never crossed the open boundary");
    assert_eq!(sim.comp_count(side_b, y).unwrap(), 0.0);
    assert_eq!(
        sim.comp_count(side_a, x).unwrap() + xb,
        1000.0,
        "X mass not conserved across the boundary"
    );

    // Closing the gate freezes the split.
    sim.set_diff_bnd_active(gate, x, false).unwrap();
    let frozen = sim.comp_count(side_b, x).unwrap();
    sim.run(0.2).unwrap();
    assert_eq!(sim.comp_count(side_b, x).unwrap(), frozen);
}

/// Reset closes every boundary: transport must be re-enabled
/// afterwards.
#[test]
fn reset_disables_boundary_transport() {
    let mut sim = gated_sim(78);
    let side_a = sim.statedef().comp_gidx("side_a").unwrap();
    let side_b = sim.statedef().comp_gidx("side_b").unwrap();
    let gate = sim.statedef().diff_bnd_gidx("gate").unwrap();
    let x = sim.statedef().spec_gidx("X").unwrap();

    sim.set_comp_count(side_a, x, 500.0).unwrap();
    sim.set_diff_bnd_active(gate, x, true).unwrap();
    sim.run(0.05).unwrap();
    assert!(sim.comp_count(side_b, x).unwrap() > 0.0);

    sim.reset();
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.nsteps(), 0);
    assert_eq!(sim.a0(), 0.0);
    assert!(!sim.diff_bnd_active(gate, x).unwrap());

    sim.set_comp_count(side_a, x, 500.0).unwrap();
    sim.run(0.05).unwrap();
    assert_eq!(sim.comp_count(side_b, x).unwrap(), 0.0);
}

/// Gating validates that the species exists on both sides.
#[test]
fn gating_rejects_one_sided_species() {
    use tetkin_core::SimError;
    use tetkin_model::{CompartmentSpec, DiffusionSpec};

    let mut model = util::gated_model(1.0e-12);
    // Z diffuses only on side A.
    model.species = tetkin_model::ModelSpec::species_from_names(["X", "Y", "Z"]);
    model.compartments = vec![
        CompartmentSpec {
            name: "side_a".into(),
            species: vec![],
        },
        CompartmentSpec {
            name: "side_b".into(),
            species: vec![],
        },
    ];
    model.diffusions.push(DiffusionSpec {
        name: "diff_Z_a".into(),
        comp: "side_a".into(),
        ligand: "Z".into(),
        dcst: 1.0e-12,
    });

    let mut sim = Solver::new(&model, &util::boundary_mesh(), SimRng::new(3)).unwrap();
    let gate = sim.statedef().diff_bnd_gidx("gate").unwrap();
    let z = sim.statedef().spec_gidx("Z").unwrap();
    let err = sim.set_diff_bnd_active(gate, z, true).unwrap_err();
    assert!(matches!(err, SimError::BoundarySpecUndefined { .. }));
}
