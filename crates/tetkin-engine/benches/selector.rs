//! Event-loop throughput: reaction-diffusion stepping on a voxel
//! chain. Exercises the composition-rejection selector's draw and
//! update paths under a realistic propensity spread.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tetkin_core::{SimRng, TetIdx};
use tetkin_engine::Solver;
use tetkin_mesh::{TetData, TetMesh};
use tetkin_model::{CompartmentSpec, DiffusionSpec, ModelSpec, ReactionSpec};

fn chain_mesh(n: usize) -> TetMesh {
    let mut tets = Vec::with_capacity(n);
    for i in 0..n {
        let mut tet = TetData {
            vol: 1.0e-18,
            areas: [1.0e-12; 4],
            dists: [1.0e-6; 4],
            neighbours: [None; 4],
            faces: [None; 4],
        };
        if i > 0 {
            tet.neighbours[0] = Some(TetIdx::from(i - 1));
        }
        if i + 1 < n {
            tet.neighbours[1] = Some(TetIdx::from(i + 1));
        }
        tets.push(tet);
    }
    let mut mesh = TetMesh::new(tets, vec![]).unwrap();
    mesh.add_compartment("cyt", (0..n).map(TetIdx::from).collect())
        .unwrap();
    mesh
}

fn reaction_diffusion_model() -> ModelSpec {
    ModelSpec {
        species: ModelSpec::species_from_names(["A", "B"]),
        compartments: vec![CompartmentSpec {
            name: "cyt".into(),
            species: vec![],
        }],
        reactions: vec![
            ReactionSpec {
                name: "fwd".into(),
                comp: "cyt".into(),
                lhs: vec![("A".into(), 1)],
                rhs: vec![("B".into(), 1)],
                kcst: 100.0,
            },
            ReactionSpec {
                name: "rev".into(),
                comp: "cyt".into(),
                lhs: vec![("B".into(), 1)],
                rhs: vec![("A".into(), 1)],
                kcst: 100.0,
            },
        ],
        diffusions: vec![
            DiffusionSpec {
                name: "diff_A".into(),
                comp: "cyt".into(),
                ligand: "A".into(),
                dcst: 1.0e-12,
            },
            DiffusionSpec {
                name: "diff_B".into(),
                comp: "cyt".into(),
                ligand: "B".into(),
                dcst: 1.0e-12,
            },
        ],
        ..ModelSpec::default()
    }
}

fn primed_solver(n_tets: usize) -> Solver {
    let mesh = chain_mesh(n_tets);
    let model = reaction_diffusion_model();
    let mut sim = Solver::new(&model, &mesh, SimRng::new(12345)).unwrap();
    let cyt = sim.statedef().comp_gidx("cyt").unwrap();
    let a = sim.statedef().spec_gidx("A").unwrap();
    sim.set_comp_count(cyt, a, 1.0e5).unwrap();
    sim
}

fn bench_stepping(c: &mut Criterion) {
    let mut group = c.benchmark_group("stepping");
    for n_tets in [16usize, 128] {
        group.bench_function(format!("advance_steps_10k/{n_tets}_tets"), |b| {
            b.iter_batched(
                || primed_solver(n_tets),
                |mut sim| {
                    sim.advance_steps(10_000);
                    sim
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stepping);
criterion_main!(benches);
