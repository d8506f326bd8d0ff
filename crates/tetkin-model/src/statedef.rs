//! Compilation of a [`ModelSpec`] against a [`TetMesh`].

use indexmap::IndexMap;
use log::debug;
use tetkin_core::{CompGIdx, DiffBndGIdx, DiffGIdx, PatchGIdx, ReacGIdx, SReacGIdx, SpecGIdx};
use tetkin_mesh::TetMesh;

use crate::compdef::CompDef;
use crate::diffboundarydef::DiffBoundaryDef;
use crate::diffdef::DiffDef;
use crate::error::ModelError;
use crate::model::ModelSpec;
use crate::patchdef::PatchDef;
use crate::reacdef::ReacDef;
use crate::specdef::SpecDef;
use crate::sreacdef::SReacDef;
use crate::{MAX_LHS, MAX_ORDER};

/// The compiled, indexed model.
///
/// Frozen at solver construction: definitions and index maps never
/// change afterwards. The def-level mutable state (aggregate pools,
/// clamp defaults, current default constants) lives inside the
/// [`CompDef`]s and [`PatchDef`]s and is reached through the `_mut`
/// accessors.
#[derive(Clone, Debug)]
pub struct StateDef {
    specs: Vec<SpecDef>,
    reacs: Vec<ReacDef>,
    sreacs: Vec<SReacDef>,
    diffs: Vec<DiffDef>,
    comps: Vec<CompDef>,
    patches: Vec<PatchDef>,
    diff_bnds: Vec<DiffBoundaryDef>,

    spec_names: IndexMap<String, SpecGIdx>,
    comp_names: IndexMap<String, CompGIdx>,
    patch_names: IndexMap<String, PatchGIdx>,
    reac_names: IndexMap<String, ReacGIdx>,
    sreac_names: IndexMap<String, SReacGIdx>,
    diff_names: IndexMap<String, DiffGIdx>,
    diff_bnd_names: IndexMap<String, DiffBndGIdx>,
}

impl StateDef {
    /// Compile a model against a mesh.
    pub fn new(model: &ModelSpec, mesh: &TetMesh) -> Result<Self, ModelError> {
        if model.species.is_empty() {
            return Err(ModelError::NoSpecies);
        }

        let mut spec_names = IndexMap::new();
        let mut specs = Vec::new();
        for sp in &model.species {
            let gidx = SpecGIdx::from(specs.len());
            if spec_names.insert(sp.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "species",
                    name: sp.name.clone(),
                });
            }
            specs.push(SpecDef::new(gidx, sp.name.clone()));
        }
        let nspecs = specs.len();

        // Compartments: resolve mesh regions and pre-compute volumes.
        let mut comp_names = IndexMap::new();
        let mut comps = Vec::new();
        for cs in &model.compartments {
            let gidx = CompGIdx::from(comps.len());
            if comp_names.insert(cs.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "compartment",
                    name: cs.name.clone(),
                });
            }
            let tets = mesh
                .compartment(&cs.name)
                .ok_or_else(|| ModelError::MissingMeshRegion {
                    kind: "compartment",
                    name: cs.name.clone(),
                })?;
            let vol = tets
                .iter()
                .map(|&t| mesh.tet(t).expect("validated region").vol)
                .sum();
            comps.push(CompDef::new(gidx, cs.name.clone(), vol, nspecs));
        }

        let mut patch_names = IndexMap::new();
        let mut patches = Vec::new();
        for ps in &model.patches {
            let gidx = PatchGIdx::from(patches.len());
            if patch_names.insert(ps.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "patch",
                    name: ps.name.clone(),
                });
            }
            let referrer = format!("patch '{}'", ps.name);
            let icomp = resolve(&comp_names, &ps.inner, &referrer, comp_err)?;
            let ocomp = ps
                .outer
                .as_ref()
                .map(|o| resolve(&comp_names, o, &referrer, comp_err))
                .transpose()?;
            let tris = mesh
                .patch(&ps.name)
                .ok_or_else(|| ModelError::MissingMeshRegion {
                    kind: "patch",
                    name: ps.name.clone(),
                })?;
            let area = tris
                .iter()
                .map(|&t| mesh.tri(t).expect("validated region").area)
                .sum();
            patches.push(PatchDef::new(
                gidx,
                ps.name.clone(),
                area,
                icomp,
                ocomp,
                nspecs,
            ));
        }

        // Reactions, surface reactions, diffusion rules.
        let mut reac_names = IndexMap::new();
        let mut reacs = Vec::new();
        for rs in &model.reactions {
            let gidx = ReacGIdx::from(reacs.len());
            if reac_names.insert(rs.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "reaction",
                    name: rs.name.clone(),
                });
            }
            let referrer = format!("reaction '{}'", rs.name);
            if rs.kcst < 0.0 {
                return Err(ModelError::NegativeConstant {
                    name: rs.name.clone(),
                    value: rs.kcst,
                });
            }
            let comp = resolve(&comp_names, &rs.comp, &referrer, comp_err)?;
            let lhs = dense(&rs.lhs, &spec_names, &rs.name, &referrer, true)?;
            let rhs = dense(&rs.rhs, &spec_names, &rs.name, &referrer, false)?;
            reacs.push(ReacDef::new(gidx, rs.name.clone(), comp, lhs, rhs, rs.kcst));
        }

        let mut sreac_names = IndexMap::new();
        let mut sreacs = Vec::new();
        for srs in &model.surface_reactions {
            let gidx = SReacGIdx::from(sreacs.len());
            if sreac_names.insert(srs.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "surface reaction",
                    name: srs.name.clone(),
                });
            }
            let referrer = format!("surface reaction '{}'", srs.name);
            if srs.kcst < 0.0 {
                return Err(ModelError::NegativeConstant {
                    name: srs.name.clone(),
                    value: srs.kcst,
                });
            }
            let patch = resolve(&patch_names, &srs.patch, &referrer, patch_err)?;
            if !srs.ilhs.is_empty() && !srs.olhs.is_empty() {
                return Err(ModelError::InnerAndOuterReactants {
                    sreac: srs.name.clone(),
                });
            }
            let touches_outer = !srs.olhs.is_empty() || !srs.orhs.is_empty();
            if touches_outer && patches[patch.index()].ocomp().is_none() {
                return Err(ModelError::NoOuterCompartment { referrer });
            }
            let lhs_s = dense(&srs.slhs, &spec_names, &srs.name, &referrer, true)?;
            let lhs_i = dense(&srs.ilhs, &spec_names, &srs.name, &referrer, true)?;
            let lhs_o = dense(&srs.olhs, &spec_names, &srs.name, &referrer, true)?;
            let rhs_s = dense(&srs.srhs, &spec_names, &srs.name, &referrer, false)?;
            let rhs_i = dense(&srs.irhs, &spec_names, &srs.name, &referrer, false)?;
            let rhs_o = dense(&srs.orhs, &spec_names, &srs.name, &referrer, false)?;
            sreacs.push(SReacDef::new(
                gidx,
                srs.name.clone(),
                patch,
                lhs_s,
                lhs_i,
                lhs_o,
                rhs_s,
                rhs_i,
                rhs_o,
                srs.kcst,
            ));
        }

        let mut diff_names = IndexMap::new();
        let mut diffs = Vec::new();
        for ds in &model.diffusions {
            let gidx = DiffGIdx::from(diffs.len());
            if diff_names.insert(ds.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "diffusion rule",
                    name: ds.name.clone(),
                });
            }
            let referrer = format!("diffusion rule '{}'", ds.name);
            if ds.dcst < 0.0 {
                return Err(ModelError::NegativeConstant {
                    name: ds.name.clone(),
                    value: ds.dcst,
                });
            }
            let comp = resolve(&comp_names, &ds.comp, &referrer, comp_err)?;
            let lig = resolve(&spec_names, &ds.ligand, &referrer, spec_err)?;
            diffs.push(DiffDef::new(gidx, ds.name.clone(), comp, lig, ds.dcst));
        }

        // Phase 2: per-def setup.
        for r in &mut reacs {
            r.setup();
            if r.order() > MAX_ORDER {
                return Err(ModelError::OrderTooHigh {
                    name: r.name().to_owned(),
                    order: r.order(),
                });
            }
        }
        for sr in &mut sreacs {
            sr.setup();
            if sr.order() > MAX_ORDER {
                return Err(ModelError::OrderTooHigh {
                    name: sr.name().to_owned(),
                    order: sr.order(),
                });
            }
        }

        // Phase 3: species membership. Compartments first, then patches,
        // which may add species to their adjacent compartments.
        for (cs, comp) in model.compartments.iter().zip(&mut comps) {
            for name in &cs.species {
                let referrer = format!("compartment '{}'", cs.name);
                comp.add_spec(resolve(&spec_names, name, &referrer, spec_err)?);
            }
        }
        for r in &reacs {
            let comp = &mut comps[r.comp().index()];
            for s in r.involved_specs() {
                comp.add_spec(s);
            }
        }
        for d in &diffs {
            comps[d.comp().index()].add_spec(d.lig());
        }
        for (ps, patch) in model.patches.iter().zip(&mut patches) {
            for name in &ps.species {
                let referrer = format!("patch '{}'", ps.name);
                patch.add_spec(resolve(&spec_names, name, &referrer, spec_err)?);
            }
        }
        for sr in &sreacs {
            let pidx = sr.patch().index();
            for s in sr.involved_s() {
                patches[pidx].add_spec(s);
            }
            let icomp = patches[pidx].icomp();
            for s in sr.involved_i() {
                comps[icomp.index()].add_spec(s);
            }
            if let Some(ocomp) = patches[pidx].ocomp() {
                for s in sr.involved_o() {
                    comps[ocomp.index()].add_spec(s);
                }
            }
        }

        // Phase 4: freeze local indices, compartments before patches.
        for comp in &mut comps {
            comp.setup_indices(&reacs, &diffs);
        }
        for patch in &mut patches {
            let icomp = &comps[patch.icomp().index()];
            let ocomp = patch.ocomp().map(|o| &comps[o.index()]);
            patch.setup_indices(&sreacs, icomp, ocomp);
        }

        // Phase 5: diffusion boundaries.
        let mut diff_bnd_names = IndexMap::new();
        let mut diff_bnds = Vec::new();
        for bs in &model.diff_boundaries {
            let gidx = DiffBndGIdx::from(diff_bnds.len());
            if diff_bnd_names.insert(bs.name.clone(), gidx).is_some() {
                return Err(ModelError::DuplicateName {
                    kind: "diffusion boundary",
                    name: bs.name.clone(),
                });
            }
            let referrer = format!("diffusion boundary '{}'", bs.name);
            let comp_a = resolve(&comp_names, &bs.comp_a, &referrer, comp_err)?;
            let comp_b = resolve(&comp_names, &bs.comp_b, &referrer, comp_err)?;
            if comp_a == comp_b {
                return Err(ModelError::BoundarySelfConnection {
                    name: bs.name.clone(),
                });
            }
            let tris = mesh
                .diff_boundary(&bs.name)
                .ok_or_else(|| ModelError::MissingMeshRegion {
                    kind: "diffusion boundary",
                    name: bs.name.clone(),
                })?;
            diff_bnds.push(DiffBoundaryDef::new(
                gidx,
                bs.name.clone(),
                comp_a,
                comp_b,
                tris.to_vec(),
            ));
        }

        debug!(
            "compiled state definition: {} species, {} reactions, {} surface reactions, \
             {} diffusion rules, {} compartments, {} patches, {} diffusion boundaries",
            specs.len(),
            reacs.len(),
            sreacs.len(),
            diffs.len(),
            comps.len(),
            patches.len(),
            diff_bnds.len()
        );

        Ok(Self {
            specs,
            reacs,
            sreacs,
            diffs,
            comps,
            patches,
            diff_bnds,
            spec_names,
            comp_names,
            patch_names,
            reac_names,
            sreac_names,
            diff_names,
            diff_bnd_names,
        })
    }

    /// Number of species.
    pub fn n_specs(&self) -> usize {
        self.specs.len()
    }

    /// Number of volume reactions.
    pub fn n_reacs(&self) -> usize {
        self.reacs.len()
    }

    /// Number of surface reactions.
    pub fn n_sreacs(&self) -> usize {
        self.sreacs.len()
    }

    /// Number of diffusion rules.
    pub fn n_diffs(&self) -> usize {
        self.diffs.len()
    }

    /// Number of compartments.
    pub fn n_comps(&self) -> usize {
        self.comps.len()
    }

    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.patches.len()
    }

    /// Number of diffusion boundaries.
    pub fn n_diff_bnds(&self) -> usize {
        self.diff_bnds.len()
    }

    /// Species definition by global index.
    pub fn spec(&self, gidx: SpecGIdx) -> &SpecDef {
        &self.specs[gidx.index()]
    }

    /// Reaction definition by global index.
    pub fn reacdef(&self, gidx: ReacGIdx) -> &ReacDef {
        &self.reacs[gidx.index()]
    }

    /// Surface-reaction definition by global index.
    pub fn sreacdef(&self, gidx: SReacGIdx) -> &SReacDef {
        &self.sreacs[gidx.index()]
    }

    /// Diffusion-rule definition by global index.
    pub fn diffdef(&self, gidx: DiffGIdx) -> &DiffDef {
        &self.diffs[gidx.index()]
    }

    /// Compartment definition by global index.
    pub fn compdef(&self, gidx: CompGIdx) -> &CompDef {
        &self.comps[gidx.index()]
    }

    /// Mutable compartment definition by global index.
    pub fn compdef_mut(&mut self, gidx: CompGIdx) -> &mut CompDef {
        &mut self.comps[gidx.index()]
    }

    /// Patch definition by global index.
    pub fn patchdef(&self, gidx: PatchGIdx) -> &PatchDef {
        &self.patches[gidx.index()]
    }

    /// Mutable patch definition by global index.
    pub fn patchdef_mut(&mut self, gidx: PatchGIdx) -> &mut PatchDef {
        &mut self.patches[gidx.index()]
    }

    /// Diffusion-boundary definition by global index.
    pub fn diff_bnd_def(&self, gidx: DiffBndGIdx) -> &DiffBoundaryDef {
        &self.diff_bnds[gidx.index()]
    }

    /// Resolve a species name.
    pub fn spec_gidx(&self, name: &str) -> Option<SpecGIdx> {
        self.spec_names.get(name).copied()
    }

    /// Resolve a compartment name.
    pub fn comp_gidx(&self, name: &str) -> Option<CompGIdx> {
        self.comp_names.get(name).copied()
    }

    /// Resolve a patch name.
    pub fn patch_gidx(&self, name: &str) -> Option<PatchGIdx> {
        self.patch_names.get(name).copied()
    }

    /// Resolve a reaction name.
    pub fn reac_gidx(&self, name: &str) -> Option<ReacGIdx> {
        self.reac_names.get(name).copied()
    }

    /// Resolve a surface-reaction name.
    pub fn sreac_gidx(&self, name: &str) -> Option<SReacGIdx> {
        self.sreac_names.get(name).copied()
    }

    /// Resolve a diffusion-rule name.
    pub fn diff_gidx(&self, name: &str) -> Option<DiffGIdx> {
        self.diff_names.get(name).copied()
    }

    /// Resolve a diffusion-boundary name.
    pub fn diff_bnd_gidx(&self, name: &str) -> Option<DiffBndGIdx> {
        self.diff_bnd_names.get(name).copied()
    }
}

fn comp_err(name: &str, referrer: &str) -> ModelError {
    ModelError::UnknownCompartment {
        name: name.into(),
        referrer: referrer.into(),
    }
}

fn patch_err(name: &str, referrer: &str) -> ModelError {
    ModelError::UnknownPatch {
        name: name.into(),
        referrer: referrer.into(),
    }
}

fn spec_err(name: &str, referrer: &str) -> ModelError {
    ModelError::UnknownSpecies {
        name: name.into(),
        referrer: referrer.into(),
    }
}

fn resolve<I: Copy>(
    map: &IndexMap<String, I>,
    name: &str,
    referrer: &str,
    err: fn(&str, &str) -> ModelError,
) -> Result<I, ModelError> {
    map.get(name).copied().ok_or_else(|| err(name, referrer))
}

/// Densify a `(name, multiplicity)` list over the global species axis.
///
/// Repeated names accumulate. Left-hand sides are capped at
/// [`MAX_LHS`] per species.
fn dense(
    pairs: &[(String, u32)],
    spec_names: &IndexMap<String, SpecGIdx>,
    decl: &str,
    referrer: &str,
    is_lhs: bool,
) -> Result<Vec<u32>, ModelError> {
    let mut out = vec![0u32; spec_names.len()];
    for (name, mult) in pairs {
        let g = resolve(spec_names, name, referrer, spec_err)?;
        out[g.index()] += mult;
        if is_lhs && out[g.index()] > MAX_LHS {
            return Err(ModelError::MultiplicityTooLarge {
                name: decl.to_owned(),
                spec: name.clone(),
                mult: out[g.index()],
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use tetkin_core::{SpecLIdx, TetIdx, TriIdx};
    use tetkin_mesh::{TetData, TriData};

    fn tet(neighbours: [Option<TetIdx>; 4]) -> TetData {
        TetData {
            vol: 1.0e-18,
            areas: [1.0e-12; 4],
            dists: [1.0e-6; 4],
            neighbours,
            faces: [None; 4],
        }
    }

    // Two tets joined through a patch triangle: tet 0 inner, tet 1 outer.
    fn membrane_mesh() -> TetMesh {
        let tets = vec![tet([None; 4]), tet([None; 4])];
        let tris = vec![TriData {
            area: 1.0e-12,
            inner: Some(TetIdx(0)),
            outer: Some(TetIdx(1)),
        }];
        let mut mesh = TetMesh::new(tets, tris).unwrap();
        mesh.add_compartment("cyt", vec![TetIdx(0)]).unwrap();
        mesh.add_compartment("ext", vec![TetIdx(1)]).unwrap();
        mesh.add_patch("memb", vec![TriIdx(0)]).unwrap();
        mesh
    }

    fn membrane_model() -> ModelSpec {
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
            reactions: vec![],
            surface_reactions: vec![SurfaceReactionSpec {
                name: "bind".into(),
                patch: "memb".into(),
                slhs: vec![("R".into(), 1)],
                ilhs: vec![],
                olhs: vec![("L".into(), 1)],
                srhs: vec![("RL".into(), 1)],
                irhs: vec![],
                orhs: vec![],
                kcst: 1.0e8,
            }],
            diffusions: vec![],
            diff_boundaries: vec![],
        }
    }

    #[test]
    fn surface_reaction_pulls_ligand_into_outer_comp() {
        let sd = StateDef::new(&membrane_model(), &membrane_mesh()).unwrap();
        let lig = sd.spec_gidx("L").unwrap();
        let ext = sd.compdef(sd.comp_gidx("ext").unwrap());
        let cyt = sd.compdef(sd.comp_gidx("cyt").unwrap());
        assert!(ext.spec_g2l(lig).is_some());
        assert!(cyt.spec_g2l(lig).is_none());
    }

    #[test]
    fn patch_tables_resolve_against_comp_local_indices() {
        let sd = StateDef::new(&membrane_model(), &membrane_mesh()).unwrap();
        let memb = sd.patchdef(sd.patch_gidx("memb").unwrap());
        let ext = sd.compdef(sd.comp_gidx("ext").unwrap());
        let sr = memb.sreac_g2l(sd.sreac_gidx("bind").unwrap()).unwrap();

        let lig_lidx = ext.spec_g2l(sd.spec_gidx("L").unwrap()).unwrap();
        assert_eq!(memb.sreac_lhs_o(sr)[lig_lidx.index()], 1);
        assert_eq!(memb.sreac_upd_o(sr)[lig_lidx.index()], -1);

        let r_lidx = memb.spec_g2l(sd.spec_gidx("R").unwrap()).unwrap();
        let rl_lidx = memb.spec_g2l(sd.spec_gidx("RL").unwrap()).unwrap();
        assert_eq!(memb.sreac_lhs_s(sr)[r_lidx.index()], 1);
        assert_eq!(memb.sreac_upd_s(sr)[r_lidx.index()], -1);
        assert_eq!(memb.sreac_upd_s(sr)[rl_lidx.index()], 1);
    }

    #[test]
    fn outer_reactants_without_outer_comp_are_rejected() {
        let mut model = membrane_model();
        model.patches[0].outer = None;
        let err = StateDef::new(&model, &membrane_mesh()).unwrap_err();
        assert!(matches!(err, ModelError::NoOuterCompartment { .. }));
    }

    #[test]
    fn inner_and_outer_reactants_are_rejected() {
        let mut model = membrane_model();
        model.surface_reactions[0].ilhs = vec![("RL".into(), 1)];
        let err = StateDef::new(&model, &membrane_mesh()).unwrap_err();
        assert!(matches!(err, ModelError::InnerAndOuterReactants { .. }));
    }

    #[test]
    fn order_cap_is_enforced() {
        let mut model = membrane_model();
        model.surface_reactions[0].slhs = vec![("R".into(), 3)];
        model.surface_reactions[0].olhs = vec![("L".into(), 2)];
        let err = StateDef::new(&model, &membrane_mesh()).unwrap_err();
        assert!(matches!(err, ModelError::OrderTooHigh { order: 5, .. }));
    }

    #[test]
    fn local_indices_ascend_with_global_order() {
        let sd = StateDef::new(&membrane_model(), &membrane_mesh()).unwrap();
        let memb = sd.patchdef(sd.patch_gidx("memb").unwrap());
        // Patch species are R and RL; R has the lower global index.
        assert_eq!(
            memb.spec_g2l(sd.spec_gidx("R").unwrap()),
            Some(SpecLIdx(0))
        );
        assert_eq!(
            memb.spec_g2l(sd.spec_gidx("RL").unwrap()),
            Some(SpecLIdx(1))
        );
    }
}
