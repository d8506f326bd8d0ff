//! Shared mesh and model builders for the integration tests.

#![allow(dead_code)]

use tetkin_core::{TetIdx, TriIdx};
use tetkin_mesh::{TetData, TetMesh, TriData};
use tetkin_model::{
    CompartmentSpec, DiffBoundarySpec, DiffusionSpec, ModelSpec, PatchSpec, ReactionSpec,
    SurfaceReactionSpec,
};

/// One femtolitre, in cubic metres.
pub const FEMTOLITRE: f64 = 1.0e-18;

/// Route engine logs through the test harness when `RUST_LOG` is set.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A tetrahedron with the given volume and no links.
pub fn lone_tet(vol: f64) -> TetData {
    TetData {
        vol,
        areas: [1.0e-12; 4],
        dists: [1.0e-6; 4],
        neighbours: [None; 4],
        faces: [None; 4],
    }
}

/// A single-tetrahedron mesh with one compartment named `comp`.
pub fn single_tet_mesh(comp: &str) -> TetMesh {
    let mut mesh = TetMesh::new(vec![lone_tet(FEMTOLITRE)], vec![]).unwrap();
    mesh.add_compartment(comp, vec![TetIdx(0)]).unwrap();
    mesh
}

/// A linear chain of `n` equal-volume tetrahedra in one compartment.
///
/// Tet `i` reaches tet `i+1` through face 1 and tet `i-1` through
/// face 0.
pub fn chain_mesh(n: usize, comp: &str) -> TetMesh {
    let mut tets = Vec::with_capacity(n);
    for i in 0..n {
        let mut tet = lone_tet(FEMTOLITRE);
        if i > 0 {
            tet.neighbours[0] = Some(TetIdx::from(i - 1));
        }
        if i + 1 < n {
            tet.neighbours[1] = Some(TetIdx::from(i + 1));
        }
        tets.push(tet);
    }
    let mut mesh = TetMesh::new(tets, vec![]).unwrap();
    mesh.add_compartment(comp, (0..n).map(TetIdx::from).collect())
        .unwrap();
    mesh
}

/// Two adjacent tetrahedra in separate compartments, joined by a
/// diffusion-boundary triangle.
///
/// Compartment "side_a" holds tet 0, "side_b" holds tet 1; triangle 0
/// is the shared face and forms the region "gate".
pub fn boundary_mesh() -> TetMesh {
    let mut tet_a = lone_tet(FEMTOLITRE);
    let mut tet_b = lone_tet(FEMTOLITRE);
    tet_a.neighbours[1] = Some(TetIdx(1));
    tet_a.faces[1] = Some(TriIdx(0));
    tet_b.neighbours[0] = Some(TetIdx(0));
    tet_b.faces[0] = Some(TriIdx(0));
    let shared = TriData {
        area: 1.0e-12,
        inner: Some(TetIdx(0)),
        outer: Some(TetIdx(1)),
    };
    let mut mesh = TetMesh::new(vec![tet_a, tet_b], vec![shared]).unwrap();
    mesh.add_compartment("side_a", vec![TetIdx(0)]).unwrap();
    mesh.add_compartment("side_b", vec![TetIdx(1)]).unwrap();
    mesh.add_diff_boundary("gate", vec![TriIdx(0)]).unwrap();
    mesh
}

/// Two tetrahedra separated by a membrane triangle: "cyt" holds
/// tet 0 (inner), "ext" holds tet 1 (outer), patch "memb" holds
/// triangle 0. The outer tetrahedron's volume is configurable.
pub fn membrane_mesh(outer_vol: f64) -> TetMesh {
    let tet_in = lone_tet(FEMTOLITRE);
    let tet_out = lone_tet(outer_vol);
    let memb = TriData {
        area: 1.0e-12,
        inner: Some(TetIdx(0)),
        outer: Some(TetIdx(1)),
    };
    let mut mesh = TetMesh::new(vec![tet_in, tet_out], vec![memb]).unwrap();
    mesh.add_compartment("cyt", vec![TetIdx(0)]).unwrap();
    mesh.add_compartment("ext", vec![TetIdx(1)]).unwrap();
    mesh.add_patch("memb", vec![TriIdx(0)]).unwrap();
    mesh
}

/// A -> (nothing) at rate `kcst` in compartment `comp`.
pub fn decay_model(comp: &str, kcst: f64) -> ModelSpec {
    ModelSpec {
        species: ModelSpec::species_from_names(["A"]),
        compartments: vec![CompartmentSpec {
            name: comp.into(),
            species: vec![],
        }],
        reactions: vec![ReactionSpec {
            name: "decay".into(),
            comp: comp.into(),
            lhs: vec![("A".into(), 1)],
            rhs: vec![],
            kcst,
        }],
        ..ModelSpec::default()
    }
}

/// One diffusing species "X" with constant `dcst` in compartment
/// `comp`.
pub fn diffusion_model(comp: &str, dcst: f64) -> ModelSpec {
    ModelSpec {
        species: ModelSpec::species_from_names(["X"]),
        compartments: vec![CompartmentSpec {
            name: comp.into(),
            species: vec![],
        }],
        diffusions: vec![DiffusionSpec {
            name: "diff_X".into(),
            comp: comp.into(),
            ligand: "X".into(),
            dcst,
        }],
        ..ModelSpec::default()
    }
}

/// A ⇌ B in one compartment with forward and reverse constants.
pub fn reversible_model(comp: &str, kf: f64, kr: f64) -> ModelSpec {
    ModelSpec {
        species: ModelSpec::species_from_names(["A", "B"]),
        compartments: vec![CompartmentSpec {
            name: comp.into(),
            species: vec![],
        }],
        reactions: vec![
            ReactionSpec {
                name: "fwd".into(),
                comp: comp.into(),
                lhs: vec![("A".into(), 1)],
                rhs: vec![("B".into(), 1)],
                kcst: kf,
            },
            ReactionSpec {
                name: "rev".into(),
                comp: comp.into(),
                lhs: vec![("B".into(), 1)],
                rhs: vec![("A".into(), 1)],
                kcst: kr,
            },
        ],
        ..ModelSpec::default()
    }
}

/// Two compartments with diffusion of "X" and "Y" in both, connected
/// by the "gate" diffusion boundary of [`boundary_mesh`].
pub fn gated_model(dcst: f64) -> ModelSpec {
    let diff = |name: &str, comp: &str, lig: &str| DiffusionSpec {
        name: name.into(),
        comp: comp.into(),
        ligand: lig.into(),
        dcst,
    };
    ModelSpec {
        species: ModelSpec::species_from_names(["X", "Y"]),
        compartments: vec![
            CompartmentSpec {
                name: "side_a".into(),
                species: vec![],
            },
            CompartmentSpec {
                name: "side_b".into(),
                species: vec![],
            },
        ],
        diffusions: vec![
            diff("diff_X_a", "side_a", "X"),
            diff("diff_X_b", "side_b", "X"),
            diff("diff_Y_a", "side_a", "Y"),
            diff("diff_Y_b", "side_b", "Y"),
        ],
        diff_boundaries: vec![DiffBoundarySpec {
            name: "gate".into(),
            comp_a: "side_a".into(),
            comp_b: "side_b".into(),
        }],
        ..ModelSpec::default()
    }
}

/// R_surf + L_outer -> RL_surf on the membrane of [`membrane_mesh`].
pub fn binding_model(kcst: f64) -> ModelSpec {
    ModelSpec {
        species: ModelSpec::species_from_names(["R", "L", "RL"]),
        compartments: vec![
            CompartmentSpec {
                name: "cyt".into(),
                species: vec![],
            },
            CompartmentSpec {
                name: "ext".into(),
                species: vec![],
            },
        ],
        patches: vec![PatchSpec {
            name: "memb".into(),
            inner: "cyt".into(),
            outer: Some("ext".into()),
            species: vec![],
        }],
        surface_reactions: vec![SurfaceReactionSpec {
            name: "bind".into(),
            patch: "memb".into(),
            slhs: vec![("R".into(), 1)],
            ilhs: vec![],
            olhs: vec![("L".into(), 1)],
            srhs: vec![("RL".into(), 1)],
            irhs: vec![],
            orhs: vec![],
            kcst,
        }],
        ..ModelSpec::default()
    }
}
