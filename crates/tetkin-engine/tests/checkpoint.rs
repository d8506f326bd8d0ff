//! Checkpoint/restore round trips.

mod util;

use tetkin_core::{SimRng, TetIdx};
use tetkin_engine::{CheckpointError, Solver};

fn running_sim(seed: u64) -> Solver {
    let mesh = util::chain_mesh(3, "cyt");
    let mut model = util::reversible_model("cyt", 10.0, 10.0);
    model.diffusions.push(tetkin_model::DiffusionSpec {
        name: "diff_A".into(),
        comp: "cyt".into(),
        ligand: "A".into(),
        dcst: 1.0e-12,
    });
    let mut sim = Solver::new(&model, &mesh, SimRng::new(seed)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    sim.set_comp_count(cyt, a, 900.0).unwrap();
    sim
}

/// Restore reproduces the pre-checkpoint total propensity (to
/// floating-point rounding: the running solver accumulated its group
/// sums incrementally, restore rebuilds them in scheduler order) and
/// two restored solvers continue bit-identically, because the
/// generator state rides along in the stream.
#[test]
fn restored_solvers_continue_identically() {
    let mut original = running_sim(5150);
    original.run(0.25).unwrap();

    let mut stream = Vec::new();
    original.checkpoint(&mut stream).unwrap();
    let a0_at_checkpoint = original.a0();
    let steps_at_checkpoint = original.nsteps();
    let cyt = original.statedef().comp_gidx("cyt").unwrap();
    let a = original.statedef().spec_gidx("A").unwrap();
    let b = original.statedef().spec_gidx("B").unwrap();
    let count_at_checkpoint = original.comp_count(cyt, a).unwrap();

    // Restore into two solvers that never saw the run, built from
    // different seeds; the stream supersedes all of their state.
    let mut first = running_sim(1);
    first.restore(&mut stream.as_slice()).unwrap();
    let mut second = running_sim(2);
    second.restore(&mut stream.as_slice()).unwrap();

    assert_eq!(first.time(), 0.25);
    assert_eq!(first.nsteps(), steps_at_checkpoint);
    assert_eq!(first.comp_count(cyt, a).unwrap(), count_at_checkpoint);
    assert!(
        (first.a0() - a0_at_checkpoint).abs() <= 1.0e-12 * a0_at_checkpoint,
        "a0 after restore {} vs before checkpoint {}",
        first.a0(),
        a0_at_checkpoint
    );
    // Identical streams build identical state, bit for bit.
    assert_eq!(first.a0(), second.a0());

    first.run(0.5).unwrap();
    second.run(0.5).unwrap();
    assert_eq!(first.nsteps(), second.nsteps());
    assert_eq!(
        first.comp_count(cyt, a).unwrap(),
        second.comp_count(cyt, a).unwrap()
    );
    assert_eq!(
        first.comp_count(cyt, b).unwrap(),
        second.comp_count(cyt, b).unwrap()
    );
    assert_eq!(
        first.tet_count(TetIdx(0), a).unwrap(),
        second.tet_count(TetIdx(0), a).unwrap()
    );
}

#[test]
fn per_voxel_constants_survive_the_round_trip() {
    let mut sim = running_sim(8);
    let fwd = sim.statedef().reac_gidx("fwd").unwrap();
    // A per-voxel override must survive, not the compartment default.
    sim.set_tet_reac_k(TetIdx(1), fwd, 25.0).unwrap();

    let mut stream = Vec::new();
    sim.checkpoint(&mut stream).unwrap();

    let mut restored = running_sim(9);
    restored.restore(&mut stream.as_slice()).unwrap();
    assert_eq!(restored.tet_reac_k(TetIdx(1), fwd).unwrap(), 25.0);
    assert_eq!(restored.tet_reac_k(TetIdx(0), fwd).unwrap(), 10.0);
}

#[test]
fn garbage_streams_are_rejected() {
    let mut sim = running_sim(3);

    let err = sim.restore(&mut &b"XXXX"[..]).unwrap_err();
    assert!(matches!(err, CheckpointError::BadMagic));

    let err = sim.restore(&mut &b"TKIN\xff"[..]).unwrap_err();
    assert!(matches!(err, CheckpointError::UnsupportedVersion { found: 0xff }));

    // Truncated body: an I/O error, not a panic.
    let mut stream = Vec::new();
    sim.checkpoint(&mut stream).unwrap();
    stream.truncate(stream.len() / 2);
    let err = sim.restore(&mut stream.as_slice()).unwrap_err();
    assert!(matches!(err, CheckpointError::Io(_)));
}
