//! The solver: construction wiring, the event loop, and the internal
//! propensity-refresh machinery. The public query and mutation surface
//! lives in `api.rs`.

use std::error::Error;
use std::fmt;

use log::debug;
use smallvec::SmallVec;
use tetkin_core::{
    CompGIdx, DiffBndGIdx, DiffLIdx, KProcIdx, PatchGIdx, ReacLIdx, SReacLIdx, SimError, SimRng,
    SpecGIdx, SpecLIdx, TetIdx, TriIdx,
};
use tetkin_mesh::TetMesh;
use tetkin_model::{ModelError, ModelSpec, StateDef};

use crate::comp::Comp;
use crate::diff::Diff;
use crate::diff_boundary::DiffBoundary;
use crate::kproc::{KProc, KProcKind};
use crate::patch::Patch;
use crate::reac::Reac;
use crate::selector::CrSelector;
use crate::sreac::SReac;
use crate::tet::Tet;
use crate::tri::Tri;

/// A rejected solver construction.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildError {
    /// The chemistry model failed to compile against the mesh.
    Model(ModelError),
    /// A patch triangle's adjacent tetrahedron belongs to no
    /// compartment.
    PatchTetUnassigned {
        /// The triangle.
        tri: TriIdx,
        /// Its unassigned neighbour.
        tet: TetIdx,
    },
    /// A patch triangle's adjacent tetrahedron belongs to a different
    /// compartment than the patch declares on that side.
    PatchTetMismatch {
        /// The triangle.
        tri: TriIdx,
        /// Which side disagreed.
        side: &'static str,
    },
    /// A surface reaction needs an outer tetrahedron that a triangle
    /// of its patch does not have.
    MissingOuterTet {
        /// The triangle without an outer tetrahedron.
        tri: TriIdx,
    },
    /// A triangle could not be attached to any face slot of its
    /// tetrahedron.
    NoFreeTetSlot {
        /// The tetrahedron whose slots were all taken.
        tet: TetIdx,
        /// The triangle that could not be attached.
        tri: TriIdx,
    },
    /// A diffusion-boundary triangle touches a tetrahedron outside the
    /// boundary's two compartments.
    BoundaryCompMismatch {
        /// The boundary name.
        boundary: String,
        /// The offending triangle.
        tri: TriIdx,
    },
    /// A diffusion-boundary triangle touches a tetrahedron that
    /// belongs to no compartment.
    BoundaryTetUnassigned {
        /// The boundary name.
        boundary: String,
        /// The unassigned tetrahedron.
        tet: TetIdx,
    },
    /// A diffusion-boundary triangle is not listed among the faces of
    /// an adjacent tetrahedron.
    BoundaryFaceMissing {
        /// The boundary name.
        boundary: String,
        /// The triangle.
        tri: TriIdx,
        /// The tetrahedron whose face list lacks it.
        tet: TetIdx,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "{e}"),
            Self::PatchTetUnassigned { tri, tet } => {
                write!(
                    f,
                    "triangle {tri} borders tetrahedron {tet}, which belongs to no compartment"
                )
            }
            Self::PatchTetMismatch { tri, side } => {
                write!(
                    f,
                    "triangle {tri}: {side} tetrahedron is not in the patch's {side} compartment"
                )
            }
            Self::MissingOuterTet { tri } => {
                write!(
                    f,
                    "a surface reaction needs an outer volume, but triangle {tri} has no \
                     outer tetrahedron"
                )
            }
            Self::NoFreeTetSlot { tet, tri } => {
                write!(f, "no free face slot on tetrahedron {tet} for triangle {tri}")
            }
            Self::BoundaryCompMismatch { boundary, tri } => {
                write!(
                    f,
                    "diffusion boundary '{boundary}': triangle {tri} does not sit between \
                     the boundary's two compartments"
                )
            }
            Self::BoundaryTetUnassigned { boundary, tet } => {
                write!(
                    f,
                    "diffusion boundary '{boundary}': tetrahedron {tet} belongs to no \
                     compartment"
                )
            }
            Self::BoundaryFaceMissing { boundary, tri, tet } => {
                write!(
                    f,
                    "diffusion boundary '{boundary}': triangle {tri} is not a face of \
                     tetrahedron {tet}"
                )
            }
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for BuildError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

/// Which precomputed update list an apply selected.
pub(crate) type Direction = usize;

/// The exact SSA solver over one mesh.
///
/// Owns the compiled model, the voxel and facet arenas, the kinetic
/// processes, the composition-rejection selector, and the PRNG. All
/// cross-references between these are plain indices; the arenas are
/// the single owner of every runtime object.
pub struct Solver {
    pub(crate) statedef: StateDef,
    pub(crate) rng: SimRng,
    pub(crate) comps: Vec<Comp>,
    pub(crate) patches: Vec<Patch>,
    pub(crate) boundaries: Vec<DiffBoundary>,
    pub(crate) tets: Vec<Option<Tet>>,
    pub(crate) tris: Vec<Option<Tri>>,
    pub(crate) kprocs: Vec<KProc>,
    pub(crate) selector: CrSelector,
    pub(crate) time: f64,
    pub(crate) nsteps: u64,
    /// Set by `reset`; the next stepping call refreshes every
    /// propensity before selecting.
    needs_update: bool,
    upd_scratch: Vec<KProcIdx>,
}

impl Solver {
    /// Build a solver from a chemistry model, a mesh, and a seeded
    /// generator.
    ///
    /// Compiles the model, instantiates voxels and facets for every
    /// mesh element assigned to a compartment or patch, wires the
    /// neighbourhood graph, creates one kinetic process per
    /// (voxel, channel) pair, materialises every dependency list, and
    /// computes the initial (all-zero) propensities.
    pub fn new(model: &ModelSpec, mesh: &TetMesh, rng: SimRng) -> Result<Self, BuildError> {
        let statedef = StateDef::new(model, mesh)?;

        let ntets = mesh.tet_count();
        let ntris = mesh.tri_count();
        let mut tets: Vec<Option<Tet>> = vec![None; ntets];
        let mut tris: Vec<Option<Tri>> = vec![None; ntris];

        // Voxels, in compartment declaration order; mesh indexing is
        // preserved so the arenas align with the geometry.
        let mut comps = Vec::with_capacity(statedef.n_comps());
        for c in 0..statedef.n_comps() {
            let cgidx = CompGIdx::from(c);
            let cdef = statedef.compdef(cgidx);
            let mut comp = Comp::new();
            let region = mesh.compartment(cdef.name()).expect("region resolved");
            for &t in region {
                let td = mesh.tet(t).expect("region validated");
                tets[t.index()] = Some(Tet::new(
                    t,
                    cgidx,
                    cdef.n_specs(),
                    td.vol,
                    td.areas,
                    td.dists,
                ));
                comp.add_tet(t, td.vol);
            }
            comps.push(comp);
        }

        // Facets.
        let mut patches = Vec::with_capacity(statedef.n_patches());
        for p in 0..statedef.n_patches() {
            let pgidx = PatchGIdx::from(p);
            let pdef = statedef.patchdef(pgidx);
            let mut patch = Patch::new();
            let region = mesh.patch(pdef.name()).expect("region resolved");
            for &t in region {
                let td = mesh.tri(t).expect("region validated");
                let inner = td.inner.expect("patch triangles have an inner tet");
                match tets[inner.index()].as_ref() {
                    None => return Err(BuildError::PatchTetUnassigned { tri: t, tet: inner }),
                    Some(itet) if itet.compdef() != pdef.icomp() => {
                        return Err(BuildError::PatchTetMismatch { tri: t, side: "inner" })
                    }
                    Some(_) => {}
                }
                let outer = match (td.outer, pdef.ocomp()) {
                    (Some(o), Some(ocomp)) => match tets[o.index()].as_ref() {
                        Some(otet) if otet.compdef() == ocomp => Some(o),
                        Some(_) => {
                            return Err(BuildError::PatchTetMismatch { tri: t, side: "outer" })
                        }
                        None => None,
                    },
                    _ => None,
                };
                tris[t.index()] = Some(Tri::new(t, pgidx, pdef.n_specs(), td.area, inner, outer));
                patch.add_tri(t, td.area);
            }
            patches.push(patch);
        }

        // Diffusion boundaries: derive, per adjacent tetrahedron, the
        // face through which the boundary is crossed, and flag that
        // face before neighbour wiring so cross-compartment links are
        // kept exactly there.
        let mut boundaries = Vec::with_capacity(statedef.n_diff_bnds());
        for b in 0..statedef.n_diff_bnds() {
            let bdef = statedef.diff_bnd_def(DiffBndGIdx::from(b));
            let mut bnd = DiffBoundary::new();
            for &tri in bdef.tris() {
                let td = mesh.tri(tri).expect("region validated");
                let pair = [
                    td.inner.expect("boundary tri has both tets"),
                    td.outer.expect("boundary tri has both tets"),
                ];
                let comp_a = bdef.comp_a();
                let comp_b = bdef.comp_b();
                let mut seen = [None; 2];
                for (k, &t) in pair.iter().enumerate() {
                    let tet = tets[t.index()].as_ref().ok_or_else(|| {
                        BuildError::BoundaryTetUnassigned {
                            boundary: bdef.name().to_owned(),
                            tet: t,
                        }
                    })?;
                    seen[k] = Some(tet.compdef());
                }
                let (a, b2) = (
                    seen[0].expect("both sides resolved"),
                    seen[1].expect("both sides resolved"),
                );
                if !((a == comp_a && b2 == comp_b) || (a == comp_b && b2 == comp_a)) {
                    return Err(BuildError::BoundaryCompMismatch {
                        boundary: bdef.name().to_owned(),
                        tri,
                    });
                }
                for &t in &pair {
                    let face = mesh
                        .tet(t)
                        .expect("validated")
                        .faces
                        .iter()
                        .position(|&f| f == Some(tri))
                        .ok_or_else(|| BuildError::BoundaryFaceMissing {
                            boundary: bdef.name().to_owned(),
                            tri,
                            tet: t,
                        })?;
                    tets[t.index()]
                        .as_mut()
                        .expect("checked above")
                        .set_diff_bnd_direction(face);
                    bnd.add_tet_direction(t, face);
                }
            }
            boundaries.push(bnd);
        }

        // Volume neighbour wiring. A link is kept when the neighbour
        // voxel exists and either shares the compartment or sits behind
        // a diffusion-boundary face.
        for t in 0..ntets {
            if tets[t].is_none() {
                continue;
            }
            let td = mesh.tet(TetIdx::from(t)).expect("mesh index");
            for i in 0..4 {
                let Some(n) = td.neighbours[i] else { continue };
                let keep = {
                    let this = tets[t].as_ref().expect("checked");
                    match tets[n.index()].as_ref() {
                        Some(other) => {
                            other.compdef() == this.compdef() || this.diff_bnd_direction(i)
                        }
                        None => false,
                    }
                };
                if keep {
                    tets[t].as_mut().expect("checked").set_next_tet(i, n);
                }
            }
        }

        // Attach each facet to a free face slot of its inner (and
        // outer) tetrahedron. A slot is free when it holds no
        // same-compartment volume neighbour and no facet yet; the slot
        // order need not match the geometric face order.
        for t in 0..ntris {
            let Some((inner, outer)) = tris[t].as_ref().map(|tr| (tr.inner_tet(), tr.outer_tet()))
            else {
                continue;
            };
            let tri_idx = TriIdx::from(t);
            attach_tri(&mut tets, inner, tri_idx)?;
            if let Some(o) = outer {
                attach_tri(&mut tets, o, tri_idx)?;
            }
        }

        // Kinetic processes: per voxel its reactions then its
        // diffusion rules, per facet its surface reactions, in mesh
        // and local-index order.
        let mut kprocs: Vec<KProc> = Vec::new();
        for t in 0..ntets {
            if tets[t].is_none() {
                continue;
            }
            let (cgidx, vol, next_comp) = {
                let tet = tets[t].as_ref().expect("checked");
                let mut nc = [None; 4];
                for i in 0..4 {
                    if let Some(n) = tet.next_tet(i) {
                        nc[i] = Some(tets[n.index()].as_ref().expect("wired to live tet").compdef());
                    }
                }
                (tet.compdef(), tet.vol(), nc)
            };
            let cdef = statedef.compdef(cgidx);

            for lr in 0..cdef.n_reacs() {
                let lridx = ReacLIdx::from(lr);
                let rdef = statedef.reacdef(cdef.reac_l2g(lridx));
                let kidx = KProcIdx::from(kprocs.len());
                kprocs.push(KProc::new(KProcKind::Reac(Reac::new(
                    rdef.gidx(),
                    lridx,
                    TetIdx::from(t),
                    vol,
                    cdef.kcst(lridx),
                    rdef.order(),
                ))));
                tets[t].as_mut().expect("checked").add_reac(kidx);
            }

            for ld in 0..cdef.n_diffs() {
                let ldidx = DiffLIdx::from(ld);
                let ddef = statedef.diffdef(cdef.diff_l2g(ldidx));
                let lig = ddef.lig();
                let lidx_tet = cdef.spec_g2l(lig).expect("ligand defined in its compartment");
                let mut neighb_lidx = [None; 4];
                for i in 0..4 {
                    if let Some(c) = next_comp[i] {
                        neighb_lidx[i] = statedef.compdef(c).spec_g2l(lig);
                    }
                }
                let kidx = KProcIdx::from(kprocs.len());
                let diff = Diff::new(
                    ddef.gidx(),
                    ldidx,
                    lig,
                    lidx_tet,
                    tets[t].as_ref().expect("checked"),
                    neighb_lidx,
                    cdef.dcst(ldidx),
                );
                kprocs.push(KProc::new(KProcKind::Diff(diff)));
                tets[t].as_mut().expect("checked").add_diff(kidx);
            }
        }

        for t in 0..ntris {
            if tris[t].is_none() {
                continue;
            }
            let (pgidx, area, inner, outer) = {
                let tri = tris[t].as_ref().expect("checked");
                (tri.patchdef(), tri.area(), tri.inner_tet(), tri.outer_tet())
            };
            let pdef = statedef.patchdef(pgidx);
            let ivol = tets[inner.index()].as_ref().expect("wired").vol();
            let ovol = outer.map(|o| tets[o.index()].as_ref().expect("wired").vol());

            for lsr in 0..pdef.n_sreacs() {
                let lsridx = SReacLIdx::from(lsr);
                let srdef = statedef.sreacdef(pdef.sreac_l2g(lsridx));
                if srdef.outside() && ovol.is_none() {
                    return Err(BuildError::MissingOuterTet {
                        tri: TriIdx::from(t),
                    });
                }
                let kidx = KProcIdx::from(kprocs.len());
                kprocs.push(KProc::new(KProcKind::SReac(SReac::new(
                    srdef,
                    lsridx,
                    TriIdx::from(t),
                    area,
                    Some(ivol),
                    ovol,
                    pdef.kcst(lsridx),
                ))));
                tris[t].as_mut().expect("checked").add_sreac(kidx);
            }
        }

        debug!(
            "solver built: {} voxels, {} facets, {} kinetic processes",
            tets.iter().flatten().count(),
            tris.iter().flatten().count(),
            kprocs.len()
        );

        let mut solver = Self {
            statedef,
            rng,
            comps,
            patches,
            boundaries,
            tets,
            tris,
            kprocs,
            selector: CrSelector::new(),
            time: 0.0,
            nsteps: 0,
            needs_update: false,
            upd_scratch: Vec::new(),
        };
        solver.setup_deps();
        solver.update_all();
        Ok(solver)
    }

    // ── Stepping ────────────────────────────────────────────────

    /// Fire at most one event.
    ///
    /// A no-op when the total propensity is zero. Otherwise draws the
    /// next event and an exponential waiting time from the current
    /// total, applies the event, refreshes the propensities its firing
    /// invalidated, and advances the clock.
    pub fn step(&mut self) {
        self.flush_pending_update();
        let Some(kp) = self.selector.select(&mut self.rng, &self.kprocs) else {
            return;
        };
        let a0 = self.selector.a0();
        if a0 == 0.0 {
            return;
        }
        let dt = self.rng.exp(a0);
        self.execute_step(kp, dt);
    }

    /// Run until the simulation clock reaches `end_time`.
    ///
    /// No event fires past `end_time`: when the next drawn waiting
    /// time would overshoot, the loop stops and the clock is set to
    /// `end_time` exactly, which is correct because the would-be event
    /// has not happened yet.
    pub fn run(&mut self, end_time: f64) -> Result<(), SimError> {
        if end_time < self.time {
            return Err(SimError::EndTimeInPast {
                end: end_time,
                now: self.time,
            });
        }
        self.flush_pending_update();
        while self.time < end_time {
            let Some(kp) = self.selector.select(&mut self.rng, &self.kprocs) else {
                break;
            };
            let a0 = self.selector.a0();
            if a0 == 0.0 {
                break;
            }
            let dt = self.rng.exp(a0);
            if self.time + dt > end_time {
                break;
            }
            self.execute_step(kp, dt);
        }
        self.time = end_time;
        Ok(())
    }

    /// Run for a span of `adv` seconds.
    pub fn advance(&mut self, adv: f64) -> Result<(), SimError> {
        if adv < 0.0 {
            return Err(SimError::NegativeValue {
                what: "time to advance",
                value: adv,
            });
        }
        self.run(self.time + adv)
    }

    /// Fire up to `n` events, with no terminal clamp on the clock.
    /// Stops early when the total propensity reaches zero.
    pub fn advance_steps(&mut self, n: u64) {
        self.flush_pending_update();
        for _ in 0..n {
            let Some(kp) = self.selector.select(&mut self.rng, &self.kprocs) else {
                return;
            };
            let a0 = self.selector.a0();
            if a0 == 0.0 {
                return;
            }
            let dt = self.rng.exp(a0);
            self.execute_step(kp, dt);
        }
    }

    /// Return the simulation to its just-constructed state.
    ///
    /// Def-level defaults are restored first, then every voxel, facet
    /// and kinetic process resets against them; the selector is
    /// emptied and the clock zeroed. Diffusion-boundary transport is
    /// disabled for every species by reset. Propensities are
    /// recomputed lazily by the next stepping call.
    pub fn reset(&mut self) {
        for c in 0..self.statedef.n_comps() {
            self.statedef.compdef_mut(CompGIdx::from(c)).reset();
        }
        for p in 0..self.statedef.n_patches() {
            self.statedef.patchdef_mut(PatchGIdx::from(p)).reset();
        }
        for tet in self.tets.iter_mut().flatten() {
            tet.reset();
        }
        for tri in self.tris.iter_mut().flatten() {
            tri.reset();
        }
        for k in 0..self.kprocs.len() {
            self.reset_kproc(KProcIdx::from(k));
        }
        self.selector.reset();
        self.time = 0.0;
        self.nsteps = 0;
        self.needs_update = true;
    }

    // ── Internal machinery ──────────────────────────────────────

    /// Restore one kinetic process to its default constants and clear
    /// its selector record.
    fn reset_kproc(&mut self, kidx: KProcIdx) {
        enum Owner {
            Reac(TetIdx, ReacLIdx),
            SReac(TriIdx, SReacLIdx),
            Diff(TetIdx, DiffLIdx),
        }
        self.kprocs[kidx.index()].reset_common();
        let owner = match &self.kprocs[kidx.index()].kind {
            KProcKind::Reac(r) => Owner::Reac(r.tet(), r.lidx()),
            KProcKind::SReac(sr) => Owner::SReac(sr.tri(), sr.lidx()),
            KProcKind::Diff(d) => Owner::Diff(d.tet(), d.lidx()),
        };
        match owner {
            Owner::Reac(tet_idx, lidx) => {
                let tet = self.tets[tet_idx.index()].as_ref().expect("owner exists");
                let kcst = self.statedef.compdef(tet.compdef()).kcst(lidx);
                let vol = tet.vol();
                if let KProcKind::Reac(r) = &mut self.kprocs[kidx.index()].kind {
                    r.set_kcst(kcst, vol);
                }
            }
            Owner::SReac(tri_idx, lidx) => {
                let tri = self.tris[tri_idx.index()].as_ref().expect("owner exists");
                let pdef = self.statedef.patchdef(tri.patchdef());
                let kcst = pdef.kcst(lidx);
                let srdef = self.statedef.sreacdef(pdef.sreac_l2g(lidx));
                let area = tri.area();
                let ivol = self.tets[tri.inner_tet().index()].as_ref().map(Tet::vol);
                let ovol = tri
                    .outer_tet()
                    .and_then(|o| self.tets[o.index()].as_ref())
                    .map(Tet::vol);
                if let KProcKind::SReac(sr) = &mut self.kprocs[kidx.index()].kind {
                    sr.set_kcst(kcst, srdef, area, ivol, ovol);
                }
            }
            Owner::Diff(tet_idx, lidx) => {
                let tet = self.tets[tet_idx.index()].as_ref().expect("owner exists");
                let dcst = self.statedef.compdef(tet.compdef()).dcst(lidx);
                if let KProcKind::Diff(d) = &mut self.kprocs[kidx.index()].kind {
                    d.reset_to(dcst, tet);
                }
            }
        }
    }

    /// Full propensity recomputation of every kinetic process.
    pub(crate) fn update_all(&mut self) {
        for k in 0..self.kprocs.len() {
            self.update_element(KProcIdx::from(k));
        }
        self.selector.recompute_total();
    }

    fn flush_pending_update(&mut self) {
        if self.needs_update {
            self.update_all();
            self.needs_update = false;
        }
    }

    /// Recompute one propensity and absorb it into the selector.
    /// Does not touch the cached total.
    pub(crate) fn update_element(&mut self, kidx: KProcIdx) {
        let rate = self.rate_of(kidx);
        self.selector.update_element(&mut self.kprocs, kidx, rate);
    }

    /// Refresh the kinetic processes of a voxel and of its adjacent
    /// facets, then the total. Called after out-of-band count changes.
    pub(crate) fn update_spec_tet(&mut self, tet: TetIdx) {
        let mut affected: SmallVec<[KProcIdx; 16]> = SmallVec::new();
        {
            let t = self.tets[tet.index()].as_ref().expect("caller checked");
            affected.extend_from_slice(t.kprocs());
            for i in 0..4 {
                if let Some(tri) = t.next_tri(i) {
                    affected
                        .extend_from_slice(self.tris[tri.index()].as_ref().expect("wired").kprocs());
                }
            }
        }
        for k in affected {
            self.update_element(k);
        }
        self.selector.recompute_total();
    }

    /// Refresh the kinetic processes of a facet, then the total.
    pub(crate) fn update_spec_tri(&mut self, tri: TriIdx) {
        let mut affected: SmallVec<[KProcIdx; 8]> = SmallVec::new();
        affected.extend_from_slice(self.tris[tri.index()].as_ref().expect("caller checked").kprocs());
        for k in affected {
            self.update_element(k);
        }
        self.selector.recompute_total();
    }

    /// The current propensity of one kinetic process.
    pub(crate) fn rate_of(&self, kidx: KProcIdx) -> f64 {
        let kp = &self.kprocs[kidx.index()];
        match &kp.kind {
            KProcKind::Reac(r) => {
                let tet = self.tets[r.tet().index()].as_ref().expect("owner exists");
                r.rate(kp.active(), tet, self.statedef.compdef(tet.compdef()))
            }
            KProcKind::SReac(sr) => {
                let tri = self.tris[sr.tri().index()].as_ref().expect("owner exists");
                let pdef = self.statedef.patchdef(tri.patchdef());
                let srdef = self.statedef.sreacdef(sr.srdef());
                let itet = self.tets[tri.inner_tet().index()]
                    .as_ref()
                    .expect("wired");
                let otet = tri
                    .outer_tet()
                    .map(|o| self.tets[o.index()].as_ref().expect("wired"));
                sr.rate(kp.active(), srdef, pdef, tri, itet, otet)
            }
            KProcKind::Diff(d) => {
                let tet = self.tets[d.tet().index()].as_ref().expect("owner exists");
                d.rate(kp.active(), tet)
            }
        }
    }

    /// The combinatorial part of one propensity.
    pub(crate) fn h_of(&self, kidx: KProcIdx) -> f64 {
        let kp = &self.kprocs[kidx.index()];
        match &kp.kind {
            KProcKind::Reac(r) => {
                let tet = self.tets[r.tet().index()].as_ref().expect("owner exists");
                r.h(tet, self.statedef.compdef(tet.compdef()))
            }
            KProcKind::SReac(sr) => {
                let tri = self.tris[sr.tri().index()].as_ref().expect("owner exists");
                let pdef = self.statedef.patchdef(tri.patchdef());
                let srdef = self.statedef.sreacdef(sr.srdef());
                let itet = self.tets[tri.inner_tet().index()]
                    .as_ref()
                    .expect("wired");
                let otet = tri
                    .outer_tet()
                    .map(|o| self.tets[o.index()].as_ref().expect("wired"));
                sr.h(srdef, pdef, tri, itet, otet)
            }
            KProcKind::Diff(d) => {
                let tet = self.tets[d.tet().index()].as_ref().expect("owner exists");
                f64::from(tet.pool(d.lidx_tet()))
            }
        }
    }

    /// Apply one event, refresh its update list, advance the clock.
    fn execute_step(&mut self, kidx: KProcIdx, dt: f64) {
        let dir = self.apply_kproc(kidx);

        let mut scratch = std::mem::take(&mut self.upd_scratch);
        scratch.clear();
        {
            let kp = &self.kprocs[kidx.index()];
            let list = match &kp.kind {
                KProcKind::Reac(r) => r.upd(),
                KProcKind::SReac(sr) => sr.upd(),
                KProcKind::Diff(d) => d.upd(dir),
            };
            scratch.extend_from_slice(list);
        }
        for &k in &scratch {
            self.update_element(k);
        }
        self.upd_scratch = scratch;

        self.selector.recompute_total();
        self.time += dt;
        self.nsteps += 1;
    }

    /// Mutate the state for one firing. Returns the direction whose
    /// update list applies (always 0 for reactions).
    fn apply_kproc(&mut self, kidx: KProcIdx) -> Direction {
        enum Fire {
            Reac(TetIdx, ReacLIdx),
            SReac(TriIdx, SReacLIdx),
            Diff,
        }
        let fire = match &self.kprocs[kidx.index()].kind {
            KProcKind::Reac(r) => Fire::Reac(r.tet(), r.lidx()),
            KProcKind::SReac(sr) => Fire::SReac(sr.tri(), sr.lidx()),
            KProcKind::Diff(_) => Fire::Diff,
        };
        let dir = match fire {
            Fire::Reac(tet, lidx) => {
                self.apply_reac(tet, lidx);
                0
            }
            Fire::SReac(tri, lidx) => {
                self.apply_sreac(tri, lidx);
                0
            }
            Fire::Diff => self.apply_diff(kidx),
        };
        self.kprocs[kidx.index()].inc_extent();
        dir
    }

    fn apply_reac(&mut self, tet: TetIdx, lidx: ReacLIdx) {
        let cgidx = self.tets[tet.index()].as_ref().expect("owner exists").compdef();
        let nspecs = self.statedef.compdef(cgidx).n_specs();
        for s in 0..nspecs {
            let l = SpecLIdx::from(s);
            if self.tets[tet.index()].as_ref().expect("checked").clamped(l) {
                continue;
            }
            let upd = self.statedef.compdef(cgidx).reac_upd(lidx)[s];
            if upd == 0 {
                continue;
            }
            self.tets[tet.index()]
                .as_mut()
                .expect("checked")
                .inc_count(l, i64::from(upd));
            self.statedef.compdef_mut(cgidx).mod_count(l, f64::from(upd));
        }
    }

    fn apply_sreac(&mut self, tri: TriIdx, lidx: SReacLIdx) {
        let (pgidx, itet, otet) = {
            let t = self.tris[tri.index()].as_ref().expect("owner exists");
            (t.patchdef(), t.inner_tet(), t.outer_tet())
        };

        let nspecs_s = self.statedef.patchdef(pgidx).n_specs();
        for s in 0..nspecs_s {
            let l = SpecLIdx::from(s);
            if self.tris[tri.index()].as_ref().expect("checked").clamped(l) {
                continue;
            }
            let upd = self.statedef.patchdef(pgidx).sreac_upd_s(lidx)[s];
            if upd == 0 {
                continue;
            }
            self.tris[tri.index()]
                .as_mut()
                .expect("checked")
                .inc_count(l, i64::from(upd));
            self.statedef.patchdef_mut(pgidx).mod_count(l, f64::from(upd));
        }

        let icomp = self.tets[itet.index()].as_ref().expect("wired").compdef();
        let nspecs_i = self.statedef.compdef(icomp).n_specs();
        for s in 0..nspecs_i {
            let l = SpecLIdx::from(s);
            if self.tets[itet.index()].as_ref().expect("wired").clamped(l) {
                continue;
            }
            let upd = self.statedef.patchdef(pgidx).sreac_upd_i(lidx)[s];
            if upd == 0 {
                continue;
            }
            self.tets[itet.index()]
                .as_mut()
                .expect("wired")
                .inc_count(l, i64::from(upd));
            self.statedef.compdef_mut(icomp).mod_count(l, f64::from(upd));
        }

        if let Some(otet) = otet {
            let ocomp = self.tets[otet.index()].as_ref().expect("wired").compdef();
            let nspecs_o = self.statedef.compdef(ocomp).n_specs();
            for s in 0..nspecs_o {
                let l = SpecLIdx::from(s);
                if self.tets[otet.index()].as_ref().expect("wired").clamped(l) {
                    continue;
                }
                let upd = self.statedef.patchdef(pgidx).sreac_upd_o(lidx)[s];
                if upd == 0 {
                    continue;
                }
                self.tets[otet.index()]
                    .as_mut()
                    .expect("wired")
                    .inc_count(l, i64::from(upd));
                self.statedef.compdef_mut(ocomp).mod_count(l, f64::from(upd));
            }
        }
    }

    fn apply_diff(&mut self, kidx: KProcIdx) -> Direction {
        let sel = self.rng.unf_ee();
        let (src, lsrc, dir, dst_l) = match &self.kprocs[kidx.index()].kind {
            KProcKind::Diff(d) => {
                let dir = d.pick_direction(sel);
                (d.tet(), d.lidx_tet(), dir, d.neighb_lidx(dir))
            }
            _ => unreachable!("apply_diff on a non-diffusion process"),
        };
        let dst = self.tets[src.index()]
            .as_ref()
            .expect("owner exists")
            .next_tet(dir)
            .expect("picked direction has a neighbour");
        let dst_l = dst_l.expect("ligand defined across an open face");

        let dst_comp = self.tets[dst.index()].as_ref().expect("wired").compdef();
        if !self.tets[dst.index()].as_ref().expect("wired").clamped(dst_l) {
            self.tets[dst.index()]
                .as_mut()
                .expect("wired")
                .inc_count(dst_l, 1);
            self.statedef.compdef_mut(dst_comp).mod_count(dst_l, 1.0);
        }
        let src_comp = self.tets[src.index()].as_ref().expect("checked").compdef();
        if !self.tets[src.index()].as_ref().expect("checked").clamped(lsrc) {
            self.tets[src.index()]
                .as_mut()
                .expect("checked")
                .inc_count(lsrc, -1);
            self.statedef.compdef_mut(src_comp).mod_count(lsrc, -1.0);
        }
        dir
    }

    // ── Dependency setup ────────────────────────────────────────

    /// Materialise every kinetic process's update list by scanning its
    /// statically reachable neighbourhood.
    fn setup_deps(&mut self) {
        enum Tag {
            Reac,
            SReac,
            Diff,
        }
        for k in 0..self.kprocs.len() {
            let kidx = KProcIdx::from(k);
            let tag = match &self.kprocs[k].kind {
                KProcKind::Reac(_) => Tag::Reac,
                KProcKind::SReac(_) => Tag::SReac,
                KProcKind::Diff(_) => Tag::Diff,
            };
            match tag {
                Tag::Reac => {
                    let deps = self.reac_deps(kidx);
                    if let KProcKind::Reac(r) = &mut self.kprocs[k].kind {
                        r.set_upd(deps);
                    }
                }
                Tag::SReac => {
                    let deps = self.sreac_deps(kidx);
                    if let KProcKind::SReac(sr) = &mut self.kprocs[k].kind {
                        sr.set_upd(deps);
                    }
                }
                Tag::Diff => {
                    let deps = self.diff_deps(kidx);
                    if let KProcKind::Diff(d) = &mut self.kprocs[k].kind {
                        for (dir, list) in deps.into_iter().enumerate() {
                            d.set_upd(dir, list);
                        }
                    }
                }
            }
        }
        debug!("dependency lists materialised for {} processes", self.kprocs.len());
    }

    /// Whether process `kidx`'s rate reads species `spec` in voxel `tet`.
    fn dep_spec_tet(&self, kidx: KProcIdx, spec: SpecGIdx, tet: TetIdx) -> bool {
        match &self.kprocs[kidx.index()].kind {
            KProcKind::Reac(r) => {
                r.tet() == tet && self.statedef.reacdef(r.rdef()).dep(spec)
            }
            KProcKind::Diff(d) => d.tet() == tet && d.lig() == spec,
            KProcKind::SReac(sr) => {
                let tri = self.tris[sr.tri().index()].as_ref().expect("owner exists");
                let srdef = self.statedef.sreacdef(sr.srdef());
                if tri.inner_tet() == tet {
                    srdef.dep_i(spec)
                } else if tri.outer_tet() == Some(tet) {
                    srdef.dep_o(spec)
                } else {
                    false
                }
            }
        }
    }

    /// Whether process `kidx`'s rate reads species `spec` on facet `tri`.
    fn dep_spec_tri(&self, kidx: KProcIdx, spec: SpecGIdx, tri: TriIdx) -> bool {
        match &self.kprocs[kidx.index()].kind {
            KProcKind::SReac(sr) => {
                sr.tri() == tri && self.statedef.sreacdef(sr.srdef()).dep_s(spec)
            }
            _ => false,
        }
    }

    /// Dependents of a reaction: processes in its voxel and adjacent
    /// facets reading any species the reaction changes.
    fn reac_deps(&self, kidx: KProcIdx) -> Vec<KProcIdx> {
        let KProcKind::Reac(r) = &self.kprocs[kidx.index()].kind else {
            unreachable!("reac_deps on a non-reaction process")
        };
        let rdef = self.statedef.reacdef(r.rdef());
        let tet_idx = r.tet();
        let tet = self.tets[tet_idx.index()].as_ref().expect("owner exists");

        let mut out = Vec::new();
        for &k2 in tet.kprocs() {
            if rdef
                .upd_coll()
                .iter()
                .any(|&s| self.dep_spec_tet(k2, s, tet_idx))
            {
                out.push(k2);
            }
        }
        for i in 0..4 {
            let Some(tri) = tet.next_tri(i) else { continue };
            for &k2 in self.tris[tri.index()].as_ref().expect("wired").kprocs() {
                if rdef
                    .upd_coll()
                    .iter()
                    .any(|&s| self.dep_spec_tet(k2, s, tet_idx))
                {
                    out.push(k2);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Dependents of a surface reaction: processes on its facet reading
    /// changed surface species, plus processes around the inner and
    /// outer voxels reading changed volume species.
    fn sreac_deps(&self, kidx: KProcIdx) -> Vec<KProcIdx> {
        let KProcKind::SReac(sr) = &self.kprocs[kidx.index()].kind else {
            unreachable!("sreac_deps on a non-surface-reaction process")
        };
        let srdef = self.statedef.sreacdef(sr.srdef());
        let tri_idx = sr.tri();
        let tri = self.tris[tri_idx.index()].as_ref().expect("owner exists");

        let mut out = Vec::new();
        for &k2 in tri.kprocs() {
            if srdef
                .upd_coll_s()
                .iter()
                .any(|&s| self.dep_spec_tri(k2, s, tri_idx))
            {
                out.push(k2);
            }
        }

        self.collect_vol_deps(tri.inner_tet(), srdef.upd_coll_i(), &mut out);
        if let Some(otet) = tri.outer_tet() {
            self.collect_vol_deps(otet, srdef.upd_coll_o(), &mut out);
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    /// Processes in `tet` and its adjacent facets reading any of
    /// `specs` in `tet`.
    fn collect_vol_deps(&self, tet_idx: TetIdx, specs: &[SpecGIdx], out: &mut Vec<KProcIdx>) {
        if specs.is_empty() {
            return;
        }
        let tet = self.tets[tet_idx.index()].as_ref().expect("wired");
        for &k2 in tet.kprocs() {
            if specs.iter().any(|&s| self.dep_spec_tet(k2, s, tet_idx)) {
                out.push(k2);
            }
        }
        for i in 0..4 {
            let Some(tri) = tet.next_tri(i) else { continue };
            for &k2 in self.tris[tri.index()].as_ref().expect("wired").kprocs() {
                if specs.iter().any(|&s| self.dep_spec_tet(k2, s, tet_idx)) {
                    out.push(k2);
                }
            }
        }
    }

    /// Per-direction dependents of a diffusion rule: readers of the
    /// ligand around the source voxel, plus readers around the
    /// destination voxel of that direction. A facet blocks volume
    /// diffusion, so a direction behind a facet keeps an empty list.
    fn diff_deps(&self, kidx: KProcIdx) -> [Vec<KProcIdx>; 4] {
        let KProcKind::Diff(d) = &self.kprocs[kidx.index()].kind else {
            unreachable!("diff_deps on a non-diffusion process")
        };
        let lig = d.lig();
        let tet_idx = d.tet();
        let tet = self.tets[tet_idx.index()].as_ref().expect("owner exists");

        let mut local = Vec::new();
        self.collect_vol_deps(tet_idx, &[lig], &mut local);

        let mut out: [Vec<KProcIdx>; 4] = Default::default();
        for (dir, slot) in out.iter_mut().enumerate() {
            let Some(next) = tet.next_tet(dir) else { continue };
            if tet.next_tri(dir).is_some() {
                continue;
            }
            let mut deps = local.clone();
            // The shared facet cannot reappear among the destination's
            // facets, so no further filtering is needed.
            self.collect_vol_deps(next, &[lig], &mut deps);
            deps.sort_unstable();
            deps.dedup();
            *slot = deps;
        }
        out
    }
}

/// Attach a facet to the first free face slot of a tetrahedron.
fn attach_tri(tets: &mut [Option<Tet>], tet_idx: TetIdx, tri: TriIdx) -> Result<(), BuildError> {
    let tet = tets[tet_idx.index()].as_mut().expect("caller checked");
    for i in 0..4 {
        if tet.next_tet(i).is_some() || tet.next_tri(i).is_some() {
            continue;
        }
        tet.set_next_tri(i, tri);
        return Ok(());
    }
    Err(BuildError::NoFreeTetSlot { tet: tet_idx, tri })
}
