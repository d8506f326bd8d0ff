//! Public query and mutation surface of the [`Solver`].
//!
//! Every method validates its handles and returns
//! [`SimError`] for precondition violations: unknown indices, species
//! or channels not defined in the addressed container, negative
//! quantities, counts beyond `u32`. Population setters redistribute
//! molecules and refresh the affected propensities before returning;
//! rate-constant setters rebuild the mesoscopic constants and do the
//! same.
//!
//! Counts are reported as `f64` (sums over many voxels), amounts in
//! moles, concentrations in mol/L.

use tetkin_core::{
    CompGIdx, DiffBndGIdx, DiffGIdx, DiffLIdx, PatchGIdx, ReacGIdx, ReacLIdx, SReacGIdx,
    SReacLIdx, SimError, SpecGIdx, SpecLIdx, TetIdx, TriIdx, AVOGADRO, LITRE_PER_CUBIC_METRE,
};
use tetkin_model::StateDef;

use crate::kproc::KProcKind;
use crate::solver::Solver;

impl Solver {
    // ── General state ───────────────────────────────────────────

    /// The compiled model this solver runs.
    pub fn statedef(&self) -> &StateDef {
        &self.statedef
    }

    /// Current simulation time, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Overwrite the simulation clock. Developer API: the state is not
    /// otherwise touched.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Number of events fired since construction or reset.
    pub fn nsteps(&self) -> u64 {
        self.nsteps
    }

    /// Overwrite the step counter. Developer API.
    pub fn set_nsteps(&mut self, nsteps: u64) {
        self.nsteps = nsteps;
    }

    /// Total propensity, as of the last selector refresh.
    pub fn a0(&self) -> f64 {
        self.selector.a0()
    }

    /// Number of kinetic processes in the schedule.
    pub fn kproc_count(&self) -> usize {
        self.kprocs.len()
    }

    // ── Validation helpers ──────────────────────────────────────

    fn check_spec(&self, spec: SpecGIdx) -> Result<(), SimError> {
        if spec.index() >= self.statedef.n_specs() {
            return Err(SimError::IndexOutOfRange {
                kind: "species",
                index: spec.0,
                count: self.statedef.n_specs() as u32,
            });
        }
        Ok(())
    }

    fn check_comp(&self, comp: CompGIdx) -> Result<(), SimError> {
        if comp.index() >= self.statedef.n_comps() {
            return Err(SimError::IndexOutOfRange {
                kind: "compartment",
                index: comp.0,
                count: self.statedef.n_comps() as u32,
            });
        }
        Ok(())
    }

    fn check_patch(&self, patch: PatchGIdx) -> Result<(), SimError> {
        if patch.index() >= self.statedef.n_patches() {
            return Err(SimError::IndexOutOfRange {
                kind: "patch",
                index: patch.0,
                count: self.statedef.n_patches() as u32,
            });
        }
        Ok(())
    }

    fn check_bnd(&self, bnd: DiffBndGIdx) -> Result<(), SimError> {
        if bnd.index() >= self.statedef.n_diff_bnds() {
            return Err(SimError::IndexOutOfRange {
                kind: "diffusion boundary",
                index: bnd.0,
                count: self.statedef.n_diff_bnds() as u32,
            });
        }
        Ok(())
    }

    fn check_reac(&self, reac: ReacGIdx) -> Result<(), SimError> {
        if reac.index() >= self.statedef.n_reacs() {
            return Err(SimError::IndexOutOfRange {
                kind: "reaction",
                index: reac.0,
                count: self.statedef.n_reacs() as u32,
            });
        }
        Ok(())
    }

    fn check_sreac(&self, sreac: SReacGIdx) -> Result<(), SimError> {
        if sreac.index() >= self.statedef.n_sreacs() {
            return Err(SimError::IndexOutOfRange {
                kind: "surface reaction",
                index: sreac.0,
                count: self.statedef.n_sreacs() as u32,
            });
        }
        Ok(())
    }

    fn check_diff(&self, diff: DiffGIdx) -> Result<(), SimError> {
        if diff.index() >= self.statedef.n_diffs() {
            return Err(SimError::IndexOutOfRange {
                kind: "diffusion rule",
                index: diff.0,
                count: self.statedef.n_diffs() as u32,
            });
        }
        Ok(())
    }

    fn check_tet(&self, tet: TetIdx) -> Result<(), SimError> {
        if tet.index() >= self.tets.len() {
            return Err(SimError::IndexOutOfRange {
                kind: "tetrahedron",
                index: tet.0,
                count: self.tets.len() as u32,
            });
        }
        if self.tets[tet.index()].is_none() {
            return Err(SimError::TetUnassigned { tet });
        }
        Ok(())
    }

    fn check_tri(&self, tri: TriIdx) -> Result<(), SimError> {
        if tri.index() >= self.tris.len() {
            return Err(SimError::IndexOutOfRange {
                kind: "triangle",
                index: tri.0,
                count: self.tris.len() as u32,
            });
        }
        if self.tris[tri.index()].is_none() {
            return Err(SimError::TriUnassigned { tri });
        }
        Ok(())
    }

    fn comp_spec_lidx(&self, comp: CompGIdx, spec: SpecGIdx) -> Result<SpecLIdx, SimError> {
        self.statedef
            .compdef(comp)
            .spec_g2l(spec)
            .ok_or_else(|| SimError::SpecUndefined {
                spec: self.statedef.spec(spec).name().to_owned(),
                container: format!("compartment '{}'", self.statedef.compdef(comp).name()),
            })
    }

    fn patch_spec_lidx(&self, patch: PatchGIdx, spec: SpecGIdx) -> Result<SpecLIdx, SimError> {
        self.statedef
            .patchdef(patch)
            .spec_g2l(spec)
            .ok_or_else(|| SimError::SpecUndefined {
                spec: self.statedef.spec(spec).name().to_owned(),
                container: format!("patch '{}'", self.statedef.patchdef(patch).name()),
            })
    }

    fn comp_reac_lidx(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<ReacLIdx, SimError> {
        self.statedef
            .compdef(comp)
            .reac_g2l(reac)
            .ok_or_else(|| SimError::ReacUndefined {
                reac: self.statedef.reacdef(reac).name().to_owned(),
                container: format!("compartment '{}'", self.statedef.compdef(comp).name()),
            })
    }

    fn comp_diff_lidx(&self, comp: CompGIdx, diff: DiffGIdx) -> Result<DiffLIdx, SimError> {
        self.statedef
            .compdef(comp)
            .diff_g2l(diff)
            .ok_or_else(|| SimError::DiffUndefined {
                diff: self.statedef.diffdef(diff).name().to_owned(),
                container: format!("compartment '{}'", self.statedef.compdef(comp).name()),
            })
    }

    fn patch_sreac_lidx(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<SReacLIdx, SimError> {
        self.statedef
            .patchdef(patch)
            .sreac_g2l(sreac)
            .ok_or_else(|| SimError::SReacUndefined {
                sreac: self.statedef.sreacdef(sreac).name().to_owned(),
                container: format!("patch '{}'", self.statedef.patchdef(patch).name()),
            })
    }

    fn check_count(n: f64) -> Result<(), SimError> {
        if n < 0.0 {
            return Err(SimError::NegativeValue {
                what: "population",
                value: n,
            });
        }
        if n > f64::from(u32::MAX) {
            return Err(SimError::CountTooLarge { value: n });
        }
        Ok(())
    }

    /// Probabilistic rounding: floor, then one more with probability
    /// equal to the fractional part.
    fn round_count(&mut self, n: f64) -> u32 {
        let n_int = n.floor();
        let n_frc = n - n_int;
        let mut c = n_int as u32;
        if n_frc > 0.0 && self.rng.unf_ie() < n_frc {
            c += 1;
        }
        c
    }

    fn set_tet_count_internal(&mut self, tet: TetIdx, spec: SpecLIdx, n: u32) {
        let comp = self.tets[tet.index()].as_ref().expect("caller checked").compdef();
        let delta = self.tets[tet.index()]
            .as_mut()
            .expect("caller checked")
            .set_count(spec, n);
        self.statedef.compdef_mut(comp).mod_count(spec, delta);
    }

    fn set_tri_count_internal(&mut self, tri: TriIdx, spec: SpecLIdx, n: u32) {
        let patch = self.tris[tri.index()].as_ref().expect("caller checked").patchdef();
        let delta = self.tris[tri.index()]
            .as_mut()
            .expect("caller checked")
            .set_count(spec, n);
        self.statedef.patchdef_mut(patch).mod_count(spec, delta);
    }

    // ── Compartments ────────────────────────────────────────────

    /// Volume of a compartment, in cubic metres.
    pub fn comp_vol(&self, comp: CompGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        Ok(self.comps[comp.index()].vol())
    }

    /// Total count of a species over a compartment's voxels.
    pub fn comp_count(&self, comp: CompGIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_spec(spec)?;
        let slidx = self.comp_spec_lidx(comp, spec)?;
        let mut count = 0u64;
        for &t in self.comps[comp.index()].tets() {
            count += u64::from(self.tets[t.index()].as_ref().expect("member").pool(slidx));
        }
        Ok(count as f64)
    }

    /// Distribute `n` molecules over a compartment proportional to
    /// voxel volume, with probabilistic rounding per voxel, and refresh
    /// every propensity.
    pub fn set_comp_count(&mut self, comp: CompGIdx, spec: SpecGIdx, n: f64) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_spec(spec)?;
        let slidx = self.comp_spec_lidx(comp, spec)?;
        Self::check_count(n)?;

        let total_vol = self.statedef.compdef(comp).vol();
        let mut c = self.round_count(n);
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();

        // Every voxel gets an independent share so no index-order bias
        // or concentration gradient appears in the injection.
        let mut nplaced: u32 = 0;
        for &t in &tets {
            if nplaced == c {
                self.set_tet_count_internal(t, slidx, 0);
                continue;
            }
            let vol = self.tets[t.index()].as_ref().expect("member").vol();
            let fract = f64::from(c) * (vol / total_vol);
            let mut n3 = self.round_count(fract);
            nplaced += n3;
            if nplaced >= c {
                n3 -= nplaced - c;
                nplaced = c;
            }
            self.set_tet_count_internal(t, slidx, n3);
        }
        debug_assert!(nplaced <= c);
        c -= nplaced;

        // Remaining molecules go to voxels picked by volume.
        while c != 0 {
            let u = self.rng.unf_ie();
            let t = self.comps[comp.index()]
                .pick_tet_by_vol(u)
                .expect("compartment with population has voxels");
            let cur = self.tets[t.index()].as_ref().expect("member").pool(slidx);
            self.set_tet_count_internal(t, slidx, cur + 1);
            c -= 1;
        }

        for &t in &tets {
            self.update_spec_tet(t);
        }
        self.update_all();
        Ok(())
    }

    /// Total amount of a species in a compartment, in moles.
    pub fn comp_amount(&self, comp: CompGIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        Ok(self.comp_count(comp, spec)? / AVOGADRO)
    }

    /// Set a compartment's species amount, in moles.
    pub fn set_comp_amount(
        &mut self,
        comp: CompGIdx,
        spec: SpecGIdx,
        amount: f64,
    ) -> Result<(), SimError> {
        if amount < 0.0 {
            return Err(SimError::NegativeValue {
                what: "amount",
                value: amount,
            });
        }
        self.set_comp_count(comp, spec, amount * AVOGADRO)
    }

    /// Concentration of a species in a compartment, in mol/L.
    pub fn comp_conc(&self, comp: CompGIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        let count = self.comp_count(comp, spec)?;
        let vol = self.statedef.compdef(comp).vol();
        Ok(count / (LITRE_PER_CUBIC_METRE * vol * AVOGADRO))
    }

    /// Set a compartment's species concentration, in mol/L.
    pub fn set_comp_conc(
        &mut self,
        comp: CompGIdx,
        spec: SpecGIdx,
        conc: f64,
    ) -> Result<(), SimError> {
        if conc < 0.0 {
            return Err(SimError::NegativeValue {
                what: "concentration",
                value: conc,
            });
        }
        self.check_comp(comp)?;
        let vol = self.statedef.compdef(comp).vol();
        self.set_comp_count(comp, spec, conc * LITRE_PER_CUBIC_METRE * vol * AVOGADRO)
    }

    /// Whether a species is clamped in every voxel of a compartment.
    pub fn comp_clamped(&self, comp: CompGIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_comp(comp)?;
        self.check_spec(spec)?;
        let slidx = self.comp_spec_lidx(comp, spec)?;
        Ok(self.comps[comp.index()]
            .tets()
            .iter()
            .all(|&t| self.tets[t.index()].as_ref().expect("member").clamped(slidx)))
    }

    /// Clamp or unclamp a species in every voxel of a compartment.
    pub fn set_comp_clamped(
        &mut self,
        comp: CompGIdx,
        spec: SpecGIdx,
        clamp: bool,
    ) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_spec(spec)?;
        let slidx = self.comp_spec_lidx(comp, spec)?;
        self.statedef.compdef_mut(comp).set_clamped(slidx, clamp);
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            self.tets[t.index()]
                .as_mut()
                .expect("member")
                .set_clamped(slidx, clamp);
        }
        Ok(())
    }

    /// The compartment-default macroscopic rate constant of a reaction.
    pub fn comp_reac_k(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        Ok(self.statedef.compdef(comp).kcst(lridx))
    }

    /// Set a reaction's rate constant in every voxel of a compartment
    /// (and as the new compartment default), then refresh all
    /// propensities.
    pub fn set_comp_reac_k(
        &mut self,
        comp: CompGIdx,
        reac: ReacGIdx,
        kcst: f64,
    ) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        if kcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "reaction constant",
                value: kcst,
            });
        }
        self.statedef.compdef_mut(comp).set_kcst(lridx, kcst);
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            let (kidx, vol) = {
                let tet = self.tets[t.index()].as_ref().expect("member");
                (tet.reac(lridx), tet.vol())
            };
            if let KProcKind::Reac(r) = &mut self.kprocs[kidx.index()].kind {
                r.set_kcst(kcst, vol);
            }
        }
        self.update_all();
        Ok(())
    }

    /// Whether a reaction is active in every voxel of a compartment.
    pub fn comp_reac_active(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<bool, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        Ok(self.comps[comp.index()].tets().iter().all(|&t| {
            let kidx = self.tets[t.index()].as_ref().expect("member").reac(lridx);
            self.kprocs[kidx.index()].active()
        }))
    }

    /// Activate or inactivate a reaction in every voxel of a
    /// compartment, then refresh all propensities.
    pub fn set_comp_reac_active(
        &mut self,
        comp: CompGIdx,
        reac: ReacGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            let kidx = self.tets[t.index()].as_ref().expect("member").reac(lridx);
            self.kprocs[kidx.index()].set_active(active);
        }
        self.update_all();
        Ok(())
    }

    /// Sum over a compartment's voxels of a reaction's combinatorial
    /// part.
    pub fn comp_reac_h(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        Ok(self.comps[comp.index()]
            .tets()
            .iter()
            .map(|&t| self.h_of(self.tets[t.index()].as_ref().expect("member").reac(lridx)))
            .sum())
    }

    /// Volume-weighted mean of a reaction's mesoscopic constant over a
    /// compartment.
    pub fn comp_reac_c(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        let mut c_weighted = 0.0;
        let mut vol = 0.0;
        for &t in self.comps[comp.index()].tets() {
            let tet = self.tets[t.index()].as_ref().expect("member");
            let kidx = tet.reac(lridx);
            if let KProcKind::Reac(r) = &self.kprocs[kidx.index()].kind {
                c_weighted += r.ccst() * tet.vol();
            }
            vol += tet.vol();
        }
        if vol == 0.0 {
            return Ok(0.0);
        }
        Ok(c_weighted / vol)
    }

    /// Total propensity of a reaction over a compartment's voxels.
    pub fn comp_reac_a(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        Ok(self.comps[comp.index()]
            .tets()
            .iter()
            .map(|&t| self.rate_of(self.tets[t.index()].as_ref().expect("member").reac(lridx)))
            .sum())
    }

    /// Cumulative firings of a reaction over a compartment's voxels.
    pub fn comp_reac_extent(&self, comp: CompGIdx, reac: ReacGIdx) -> Result<u64, SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        Ok(self.comps[comp.index()]
            .tets()
            .iter()
            .map(|&t| {
                let kidx = self.tets[t.index()].as_ref().expect("member").reac(lridx);
                self.kprocs[kidx.index()].extent()
            })
            .sum())
    }

    /// Zero the firing counters of a reaction over a compartment.
    pub fn reset_comp_reac_extent(&mut self, comp: CompGIdx, reac: ReacGIdx) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_reac(reac)?;
        let lridx = self.comp_reac_lidx(comp, reac)?;
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            let kidx = self.tets[t.index()].as_ref().expect("member").reac(lridx);
            self.kprocs[kidx.index()].reset_extent();
        }
        Ok(())
    }

    /// The compartment-default diffusion constant of a rule.
    pub fn comp_diff_d(&self, comp: CompGIdx, diff: DiffGIdx) -> Result<f64, SimError> {
        self.check_comp(comp)?;
        self.check_diff(diff)?;
        let ldidx = self.comp_diff_lidx(comp, diff)?;
        Ok(self.statedef.compdef(comp).dcst(ldidx))
    }

    /// Set a diffusion constant in every voxel of a compartment (and
    /// as the new compartment default), then refresh all propensities.
    pub fn set_comp_diff_d(
        &mut self,
        comp: CompGIdx,
        diff: DiffGIdx,
        dcst: f64,
    ) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_diff(diff)?;
        let ldidx = self.comp_diff_lidx(comp, diff)?;
        if dcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "diffusion constant",
                value: dcst,
            });
        }
        self.statedef.compdef_mut(comp).set_dcst(ldidx, dcst);
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            let kidx = self.tets[t.index()].as_ref().expect("member").diff(ldidx);
            if let KProcKind::Diff(d) = &mut self.kprocs[kidx.index()].kind {
                d.set_dcst(dcst, self.tets[t.index()].as_ref().expect("member"));
            }
        }
        self.update_all();
        Ok(())
    }

    /// Whether a diffusion rule is active in every voxel of a
    /// compartment.
    pub fn comp_diff_active(&self, comp: CompGIdx, diff: DiffGIdx) -> Result<bool, SimError> {
        self.check_comp(comp)?;
        self.check_diff(diff)?;
        let ldidx = self.comp_diff_lidx(comp, diff)?;
        Ok(self.comps[comp.index()].tets().iter().all(|&t| {
            let kidx = self.tets[t.index()].as_ref().expect("member").diff(ldidx);
            self.kprocs[kidx.index()].active()
        }))
    }

    /// Activate or inactivate a diffusion rule in every voxel of a
    /// compartment, then refresh all propensities.
    pub fn set_comp_diff_active(
        &mut self,
        comp: CompGIdx,
        diff: DiffGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_comp(comp)?;
        self.check_diff(diff)?;
        let ldidx = self.comp_diff_lidx(comp, diff)?;
        let tets: Vec<TetIdx> = self.comps[comp.index()].tets().to_vec();
        for t in tets {
            let kidx = self.tets[t.index()].as_ref().expect("member").diff(ldidx);
            self.kprocs[kidx.index()].set_active(active);
        }
        self.update_all();
        Ok(())
    }

    // ── Patches ─────────────────────────────────────────────────

    /// Area of a patch, in square metres.
    pub fn patch_area(&self, patch: PatchGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        Ok(self.patches[patch.index()].area())
    }

    /// Total count of a species over a patch's facets.
    pub fn patch_count(&self, patch: PatchGIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        self.check_spec(spec)?;
        let slidx = self.patch_spec_lidx(patch, spec)?;
        let mut count = 0u64;
        for &t in self.patches[patch.index()].tris() {
            count += u64::from(self.tris[t.index()].as_ref().expect("member").pool(slidx));
        }
        Ok(count as f64)
    }

    /// Distribute `n` molecules over a patch proportional to facet
    /// area, with probabilistic rounding per facet, and refresh every
    /// propensity.
    pub fn set_patch_count(
        &mut self,
        patch: PatchGIdx,
        spec: SpecGIdx,
        n: f64,
    ) -> Result<(), SimError> {
        self.check_patch(patch)?;
        self.check_spec(spec)?;
        let slidx = self.patch_spec_lidx(patch, spec)?;
        Self::check_count(n)?;

        let total_area = self.statedef.patchdef(patch).area();
        let mut c = self.round_count(n);
        let tris: Vec<TriIdx> = self.patches[patch.index()].tris().to_vec();

        let mut nplaced: u32 = 0;
        for &t in &tris {
            if nplaced == c {
                self.set_tri_count_internal(t, slidx, 0);
                continue;
            }
            let area = self.tris[t.index()].as_ref().expect("member").area();
            let fract = f64::from(c) * (area / total_area);
            let mut n3 = self.round_count(fract);
            nplaced += n3;
            if nplaced >= c {
                n3 -= nplaced - c;
                nplaced = c;
            }
            self.set_tri_count_internal(t, slidx, n3);
        }
        debug_assert!(nplaced <= c);
        c -= nplaced;

        while c != 0 {
            let u = self.rng.unf_ie();
            let t = self.patches[patch.index()]
                .pick_tri_by_area(u)
                .expect("patch with population has facets");
            let cur = self.tris[t.index()].as_ref().expect("member").pool(slidx);
            self.set_tri_count_internal(t, slidx, cur + 1);
            c -= 1;
        }

        for &t in &tris {
            self.update_spec_tri(t);
        }
        self.update_all();
        Ok(())
    }

    /// Total amount of a species on a patch, in moles.
    pub fn patch_amount(&self, patch: PatchGIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        Ok(self.patch_count(patch, spec)? / AVOGADRO)
    }

    /// Set a patch's species amount, in moles.
    pub fn set_patch_amount(
        &mut self,
        patch: PatchGIdx,
        spec: SpecGIdx,
        amount: f64,
    ) -> Result<(), SimError> {
        if amount < 0.0 {
            return Err(SimError::NegativeValue {
                what: "amount",
                value: amount,
            });
        }
        self.set_patch_count(patch, spec, amount * AVOGADRO)
    }

    /// Whether a species is clamped on every facet of a patch.
    pub fn patch_clamped(&self, patch: PatchGIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_patch(patch)?;
        self.check_spec(spec)?;
        let slidx = self.patch_spec_lidx(patch, spec)?;
        Ok(self.patches[patch.index()]
            .tris()
            .iter()
            .all(|&t| self.tris[t.index()].as_ref().expect("member").clamped(slidx)))
    }

    /// Clamp or unclamp a species on every facet of a patch.
    pub fn set_patch_clamped(
        &mut self,
        patch: PatchGIdx,
        spec: SpecGIdx,
        clamp: bool,
    ) -> Result<(), SimError> {
        self.check_patch(patch)?;
        self.check_spec(spec)?;
        let slidx = self.patch_spec_lidx(patch, spec)?;
        self.statedef.patchdef_mut(patch).set_clamped(slidx, clamp);
        let tris: Vec<TriIdx> = self.patches[patch.index()].tris().to_vec();
        for t in tris {
            self.tris[t.index()]
                .as_mut()
                .expect("member")
                .set_clamped(slidx, clamp);
        }
        Ok(())
    }

    /// The patch-default rate constant of a surface reaction.
    pub fn patch_sreac_k(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        Ok(self.statedef.patchdef(patch).kcst(lsridx))
    }

    /// Set a surface reaction's rate constant on every facet of a
    /// patch (and as the new patch default), then refresh all
    /// propensities.
    pub fn set_patch_sreac_k(
        &mut self,
        patch: PatchGIdx,
        sreac: SReacGIdx,
        kcst: f64,
    ) -> Result<(), SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        if kcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "surface reaction constant",
                value: kcst,
            });
        }
        self.statedef.patchdef_mut(patch).set_kcst(lsridx, kcst);
        let tris: Vec<TriIdx> = self.patches[patch.index()].tris().to_vec();
        for t in tris {
            self.set_tri_sreac_kcst_internal(t, lsridx, kcst);
        }
        self.update_all();
        Ok(())
    }

    fn set_tri_sreac_kcst_internal(&mut self, tri: TriIdx, lsridx: SReacLIdx, kcst: f64) {
        let (kidx, area, ivol, ovol, srgidx) = {
            let tr = self.tris[tri.index()].as_ref().expect("member");
            let ivol = self.tets[tr.inner_tet().index()].as_ref().map(|t| t.vol());
            let ovol = tr
                .outer_tet()
                .and_then(|o| self.tets[o.index()].as_ref())
                .map(|t| t.vol());
            let pdef = self.statedef.patchdef(tr.patchdef());
            (
                tr.sreac(lsridx),
                tr.area(),
                ivol,
                ovol,
                pdef.sreac_l2g(lsridx),
            )
        };
        let srdef = self.statedef.sreacdef(srgidx);
        if let KProcKind::SReac(sr) = &mut self.kprocs[kidx.index()].kind {
            sr.set_kcst(kcst, srdef, area, ivol, ovol);
        }
    }

    /// Whether a surface reaction is active on every facet of a patch.
    pub fn patch_sreac_active(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<bool, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        Ok(self.patches[patch.index()].tris().iter().all(|&t| {
            let kidx = self.tris[t.index()].as_ref().expect("member").sreac(lsridx);
            self.kprocs[kidx.index()].active()
        }))
    }

    /// Activate or inactivate a surface reaction on every facet of a
    /// patch, then refresh all propensities.
    pub fn set_patch_sreac_active(
        &mut self,
        patch: PatchGIdx,
        sreac: SReacGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        let tris: Vec<TriIdx> = self.patches[patch.index()].tris().to_vec();
        for t in tris {
            let kidx = self.tris[t.index()].as_ref().expect("member").sreac(lsridx);
            self.kprocs[kidx.index()].set_active(active);
        }
        self.update_all();
        Ok(())
    }

    /// Sum over a patch's facets of a surface reaction's combinatorial
    /// part.
    pub fn patch_sreac_h(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        Ok(self.patches[patch.index()]
            .tris()
            .iter()
            .map(|&t| self.h_of(self.tris[t.index()].as_ref().expect("member").sreac(lsridx)))
            .sum())
    }

    /// Area-weighted mean of a surface reaction's mesoscopic constant
    /// over a patch.
    pub fn patch_sreac_c(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        let mut c_weighted = 0.0;
        let mut area = 0.0;
        for &t in self.patches[patch.index()].tris() {
            let tri = self.tris[t.index()].as_ref().expect("member");
            let kidx = tri.sreac(lsridx);
            if let KProcKind::SReac(sr) = &self.kprocs[kidx.index()].kind {
                c_weighted += sr.ccst() * tri.area();
            }
            area += tri.area();
        }
        if area == 0.0 {
            return Ok(0.0);
        }
        Ok(c_weighted / area)
    }

    /// Total propensity of a surface reaction over a patch's facets.
    pub fn patch_sreac_a(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        Ok(self.patches[patch.index()]
            .tris()
            .iter()
            .map(|&t| self.rate_of(self.tris[t.index()].as_ref().expect("member").sreac(lsridx)))
            .sum())
    }

    /// Cumulative firings of a surface reaction over a patch's facets.
    pub fn patch_sreac_extent(&self, patch: PatchGIdx, sreac: SReacGIdx) -> Result<u64, SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        Ok(self.patches[patch.index()]
            .tris()
            .iter()
            .map(|&t| {
                let kidx = self.tris[t.index()].as_ref().expect("member").sreac(lsridx);
                self.kprocs[kidx.index()].extent()
            })
            .sum())
    }

    /// Zero the firing counters of a surface reaction over a patch.
    pub fn reset_patch_sreac_extent(
        &mut self,
        patch: PatchGIdx,
        sreac: SReacGIdx,
    ) -> Result<(), SimError> {
        self.check_patch(patch)?;
        self.check_sreac(sreac)?;
        let lsridx = self.patch_sreac_lidx(patch, sreac)?;
        let tris: Vec<TriIdx> = self.patches[patch.index()].tris().to_vec();
        for t in tris {
            let kidx = self.tris[t.index()].as_ref().expect("member").sreac(lsridx);
            self.kprocs[kidx.index()].reset_extent();
        }
        Ok(())
    }

    // ── Diffusion boundaries ────────────────────────────────────

    /// Enable or disable transport of one species across a diffusion
    /// boundary, then refresh the affected propensities.
    ///
    /// The species must be defined in both connected compartments.
    pub fn set_diff_bnd_active(
        &mut self,
        bnd: DiffBndGIdx,
        spec: SpecGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_bnd(bnd)?;
        self.check_spec(spec)?;
        self.check_bnd_spec(bnd, spec)?;

        let pairs: Vec<(TetIdx, usize)> =
            self.boundaries[bnd.index()].tet_directions().collect();
        let mut touched = Vec::new();
        for (t, dir) in pairs {
            let comp = self.tets[t.index()].as_ref().expect("boundary tet").compdef();
            let n_diffs = self.statedef.compdef(comp).n_diffs();
            for ld in 0..n_diffs {
                let ldidx = DiffLIdx::from(ld);
                let dgidx = self.statedef.compdef(comp).diff_l2g(ldidx);
                if self.statedef.diffdef(dgidx).lig() != spec {
                    continue;
                }
                let kidx = self.tets[t.index()].as_ref().expect("boundary tet").diff(ldidx);
                if let KProcKind::Diff(d) = &mut self.kprocs[kidx.index()].kind {
                    d.set_bnd_active(dir, active, self.tets[t.index()].as_ref().expect("boundary tet"));
                }
                touched.push(kidx);
            }
        }
        for k in touched {
            self.update_element(k);
        }
        self.selector.recompute_total();
        Ok(())
    }

    /// Whether transport of one species across a diffusion boundary is
    /// active.
    pub fn diff_bnd_active(&self, bnd: DiffBndGIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_bnd(bnd)?;
        self.check_spec(spec)?;
        self.check_bnd_spec(bnd, spec)?;

        for (t, dir) in self.boundaries[bnd.index()].tet_directions() {
            let tet = self.tets[t.index()].as_ref().expect("boundary tet");
            let cdef = self.statedef.compdef(tet.compdef());
            for ld in 0..cdef.n_diffs() {
                let ldidx = DiffLIdx::from(ld);
                if self.statedef.diffdef(cdef.diff_l2g(ldidx)).lig() != spec {
                    continue;
                }
                // One face answers for the whole boundary: activation
                // always writes every face.
                if let KProcKind::Diff(d) = &self.kprocs[tet.diff(ldidx).index()].kind {
                    return Ok(d.bnd_active(dir));
                }
            }
        }
        Ok(false)
    }

    fn check_bnd_spec(&self, bnd: DiffBndGIdx, spec: SpecGIdx) -> Result<(), SimError> {
        let bdef = self.statedef.diff_bnd_def(bnd);
        let in_a = self.statedef.compdef(bdef.comp_a()).spec_g2l(spec).is_some();
        let in_b = self.statedef.compdef(bdef.comp_b()).spec_g2l(spec).is_some();
        if !(in_a && in_b) {
            return Err(SimError::BoundarySpecUndefined {
                spec: self.statedef.spec(spec).name().to_owned(),
                boundary: bdef.name().to_owned(),
            });
        }
        Ok(())
    }

    // ── Tetrahedra ──────────────────────────────────────────────

    /// Volume of one tetrahedron, in cubic metres.
    pub fn tet_vol(&self, tet: TetIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        Ok(self.tets[tet.index()].as_ref().expect("checked").vol())
    }

    /// Voxel volumes are frozen at construction.
    pub fn set_tet_vol(&mut self, _tet: TetIdx, _vol: f64) -> Result<(), SimError> {
        Err(SimError::NotImplemented {
            op: "changing a tetrahedron volume at runtime",
        })
    }

    /// Whether a species has a local index in a tetrahedron's
    /// compartment. False for unassigned tetrahedra.
    pub fn tet_spec_defined(&self, tet: TetIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_spec(spec)?;
        if tet.index() >= self.tets.len() {
            return Err(SimError::IndexOutOfRange {
                kind: "tetrahedron",
                index: tet.0,
                count: self.tets.len() as u32,
            });
        }
        Ok(self.tets[tet.index()]
            .as_ref()
            .is_some_and(|t| self.statedef.compdef(t.compdef()).spec_g2l(spec).is_some()))
    }

    fn tet_spec_lidx(&self, tet: TetIdx, spec: SpecGIdx) -> Result<SpecLIdx, SimError> {
        let t = self.tets[tet.index()].as_ref().expect("caller checked");
        self.statedef
            .compdef(t.compdef())
            .spec_g2l(spec)
            .ok_or_else(|| SimError::SpecUndefined {
                spec: self.statedef.spec(spec).name().to_owned(),
                container: format!("tetrahedron {tet}"),
            })
    }

    /// Count of a species in one tetrahedron.
    pub fn tet_count(&self, tet: TetIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_spec(spec)?;
        let slidx = self.tet_spec_lidx(tet, spec)?;
        Ok(f64::from(self.tets[tet.index()].as_ref().expect("checked").pool(slidx)))
    }

    /// Set the count of a species in one tetrahedron (probabilistic
    /// rounding of the fractional part) and refresh the propensities
    /// around it.
    pub fn set_tet_count(&mut self, tet: TetIdx, spec: SpecGIdx, n: f64) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_spec(spec)?;
        let slidx = self.tet_spec_lidx(tet, spec)?;
        Self::check_count(n)?;
        let c = self.round_count(n);
        self.set_tet_count_internal(tet, slidx, c);
        self.update_spec_tet(tet);
        Ok(())
    }

    /// Amount of a species in one tetrahedron, in moles.
    pub fn tet_amount(&self, tet: TetIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        Ok(self.tet_count(tet, spec)? / AVOGADRO)
    }

    /// Set a tetrahedron's species amount, in moles.
    pub fn set_tet_amount(&mut self, tet: TetIdx, spec: SpecGIdx, amount: f64) -> Result<(), SimError> {
        if amount < 0.0 {
            return Err(SimError::NegativeValue {
                what: "amount",
                value: amount,
            });
        }
        self.set_tet_count(tet, spec, amount * AVOGADRO)
    }

    /// Concentration of a species in one tetrahedron, in mol/L.
    pub fn tet_conc(&self, tet: TetIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        let count = self.tet_count(tet, spec)?;
        let vol = self.tets[tet.index()].as_ref().expect("checked").vol();
        Ok(count / (LITRE_PER_CUBIC_METRE * vol * AVOGADRO))
    }

    /// Set a tetrahedron's species concentration, in mol/L.
    pub fn set_tet_conc(&mut self, tet: TetIdx, spec: SpecGIdx, conc: f64) -> Result<(), SimError> {
        if conc < 0.0 {
            return Err(SimError::NegativeValue {
                what: "concentration",
                value: conc,
            });
        }
        self.check_tet(tet)?;
        let vol = self.tets[tet.index()].as_ref().expect("checked").vol();
        self.set_tet_count(tet, spec, conc * LITRE_PER_CUBIC_METRE * vol * AVOGADRO)
    }

    /// Clamp flag of a species in one tetrahedron.
    pub fn tet_clamped(&self, tet: TetIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_tet(tet)?;
        self.check_spec(spec)?;
        let slidx = self.tet_spec_lidx(tet, spec)?;
        Ok(self.tets[tet.index()].as_ref().expect("checked").clamped(slidx))
    }

    /// Clamp or unclamp a species in one tetrahedron.
    pub fn set_tet_clamped(
        &mut self,
        tet: TetIdx,
        spec: SpecGIdx,
        clamp: bool,
    ) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_spec(spec)?;
        let slidx = self.tet_spec_lidx(tet, spec)?;
        self.tets[tet.index()]
            .as_mut()
            .expect("checked")
            .set_clamped(slidx, clamp);
        Ok(())
    }

    fn tet_reac_lidx(&self, tet: TetIdx, reac: ReacGIdx) -> Result<ReacLIdx, SimError> {
        let t = self.tets[tet.index()].as_ref().expect("caller checked");
        self.statedef
            .compdef(t.compdef())
            .reac_g2l(reac)
            .ok_or_else(|| SimError::ReacUndefined {
                reac: self.statedef.reacdef(reac).name().to_owned(),
                container: format!("tetrahedron {tet}"),
            })
    }

    fn tet_diff_lidx(&self, tet: TetIdx, diff: DiffGIdx) -> Result<DiffLIdx, SimError> {
        let t = self.tets[tet.index()].as_ref().expect("caller checked");
        self.statedef
            .compdef(t.compdef())
            .diff_g2l(diff)
            .ok_or_else(|| SimError::DiffUndefined {
                diff: self.statedef.diffdef(diff).name().to_owned(),
                container: format!("tetrahedron {tet}"),
            })
    }

    /// Rate constant of a reaction in one tetrahedron.
    pub fn tet_reac_k(&self, tet: TetIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").reac(lridx);
        match &self.kprocs[kidx.index()].kind {
            KProcKind::Reac(r) => Ok(r.kcst()),
            _ => unreachable!("reaction slot holds a reaction"),
        }
    }

    /// Set a reaction's rate constant in one tetrahedron only, then
    /// refresh its propensity. The compartment default is untouched.
    pub fn set_tet_reac_k(&mut self, tet: TetIdx, reac: ReacGIdx, kcst: f64) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        if kcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "reaction constant",
                value: kcst,
            });
        }
        let (kidx, vol) = {
            let t = self.tets[tet.index()].as_ref().expect("checked");
            (t.reac(lridx), t.vol())
        };
        if let KProcKind::Reac(r) = &mut self.kprocs[kidx.index()].kind {
            r.set_kcst(kcst, vol);
        }
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Whether a reaction is active in one tetrahedron.
    pub fn tet_reac_active(&self, tet: TetIdx, reac: ReacGIdx) -> Result<bool, SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").reac(lridx);
        Ok(self.kprocs[kidx.index()].active())
    }

    /// Activate or inactivate a reaction in one tetrahedron, then
    /// refresh its propensity.
    pub fn set_tet_reac_active(
        &mut self,
        tet: TetIdx,
        reac: ReacGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").reac(lridx);
        self.kprocs[kidx.index()].set_active(active);
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Diffusion constant of a rule in one tetrahedron.
    pub fn tet_diff_d(&self, tet: TetIdx, diff: DiffGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_diff(diff)?;
        let ldidx = self.tet_diff_lidx(tet, diff)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").diff(ldidx);
        match &self.kprocs[kidx.index()].kind {
            KProcKind::Diff(d) => Ok(d.dcst()),
            _ => unreachable!("diffusion slot holds a diffusion"),
        }
    }

    /// Set a diffusion constant in one tetrahedron only, then refresh
    /// its propensity. The compartment default is untouched.
    pub fn set_tet_diff_d(&mut self, tet: TetIdx, diff: DiffGIdx, dcst: f64) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_diff(diff)?;
        let ldidx = self.tet_diff_lidx(tet, diff)?;
        if dcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "diffusion constant",
                value: dcst,
            });
        }
        let kidx = self.tets[tet.index()].as_ref().expect("checked").diff(ldidx);
        if let KProcKind::Diff(d) = &mut self.kprocs[kidx.index()].kind {
            d.set_dcst(dcst, self.tets[tet.index()].as_ref().expect("checked"));
        }
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Whether a diffusion rule is active in one tetrahedron.
    pub fn tet_diff_active(&self, tet: TetIdx, diff: DiffGIdx) -> Result<bool, SimError> {
        self.check_tet(tet)?;
        self.check_diff(diff)?;
        let ldidx = self.tet_diff_lidx(tet, diff)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").diff(ldidx);
        Ok(self.kprocs[kidx.index()].active())
    }

    /// Activate or inactivate a diffusion rule in one tetrahedron,
    /// then refresh its propensity.
    pub fn set_tet_diff_active(
        &mut self,
        tet: TetIdx,
        diff: DiffGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_tet(tet)?;
        self.check_diff(diff)?;
        let ldidx = self.tet_diff_lidx(tet, diff)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").diff(ldidx);
        self.kprocs[kidx.index()].set_active(active);
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Combinatorial part of a reaction's propensity in one
    /// tetrahedron.
    pub fn tet_reac_h(&self, tet: TetIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        Ok(self.h_of(self.tets[tet.index()].as_ref().expect("checked").reac(lridx)))
    }

    /// Mesoscopic constant of a reaction in one tetrahedron.
    pub fn tet_reac_c(&self, tet: TetIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        let kidx = self.tets[tet.index()].as_ref().expect("checked").reac(lridx);
        match &self.kprocs[kidx.index()].kind {
            KProcKind::Reac(r) => Ok(r.ccst()),
            _ => unreachable!("reaction slot holds a reaction"),
        }
    }

    /// Propensity of a reaction in one tetrahedron.
    pub fn tet_reac_a(&self, tet: TetIdx, reac: ReacGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_reac(reac)?;
        let lridx = self.tet_reac_lidx(tet, reac)?;
        Ok(self.rate_of(self.tets[tet.index()].as_ref().expect("checked").reac(lridx)))
    }

    /// Propensity of a diffusion rule in one tetrahedron.
    pub fn tet_diff_a(&self, tet: TetIdx, diff: DiffGIdx) -> Result<f64, SimError> {
        self.check_tet(tet)?;
        self.check_diff(diff)?;
        let ldidx = self.tet_diff_lidx(tet, diff)?;
        Ok(self.rate_of(self.tets[tet.index()].as_ref().expect("checked").diff(ldidx)))
    }

    // ── Triangles ───────────────────────────────────────────────

    /// Area of one triangle, in square metres.
    pub fn tri_area(&self, tri: TriIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        Ok(self.tris[tri.index()].as_ref().expect("checked").area())
    }

    /// Facet areas are frozen at construction.
    pub fn set_tri_area(&mut self, _tri: TriIdx, _area: f64) -> Result<(), SimError> {
        Err(SimError::NotImplemented {
            op: "changing a triangle area at runtime",
        })
    }

    /// Whether a species has a local index on a triangle's patch.
    /// False for unassigned triangles.
    pub fn tri_spec_defined(&self, tri: TriIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_spec(spec)?;
        if tri.index() >= self.tris.len() {
            return Err(SimError::IndexOutOfRange {
                kind: "triangle",
                index: tri.0,
                count: self.tris.len() as u32,
            });
        }
        Ok(self.tris[tri.index()]
            .as_ref()
            .is_some_and(|t| self.statedef.patchdef(t.patchdef()).spec_g2l(spec).is_some()))
    }

    fn tri_spec_lidx(&self, tri: TriIdx, spec: SpecGIdx) -> Result<SpecLIdx, SimError> {
        let t = self.tris[tri.index()].as_ref().expect("caller checked");
        self.statedef
            .patchdef(t.patchdef())
            .spec_g2l(spec)
            .ok_or_else(|| SimError::SpecUndefined {
                spec: self.statedef.spec(spec).name().to_owned(),
                container: format!("triangle {tri}"),
            })
    }

    /// Count of a species on one triangle.
    pub fn tri_count(&self, tri: TriIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        self.check_spec(spec)?;
        let slidx = self.tri_spec_lidx(tri, spec)?;
        Ok(f64::from(self.tris[tri.index()].as_ref().expect("checked").pool(slidx)))
    }

    /// Set the count of a species on one triangle (probabilistic
    /// rounding of the fractional part) and refresh the propensities
    /// of its processes.
    pub fn set_tri_count(&mut self, tri: TriIdx, spec: SpecGIdx, n: f64) -> Result<(), SimError> {
        self.check_tri(tri)?;
        self.check_spec(spec)?;
        let slidx = self.tri_spec_lidx(tri, spec)?;
        Self::check_count(n)?;
        let c = self.round_count(n);
        self.set_tri_count_internal(tri, slidx, c);
        self.update_spec_tri(tri);
        Ok(())
    }

    /// Amount of a species on one triangle, in moles.
    pub fn tri_amount(&self, tri: TriIdx, spec: SpecGIdx) -> Result<f64, SimError> {
        Ok(self.tri_count(tri, spec)? / AVOGADRO)
    }

    /// Set a triangle's species amount, in moles.
    pub fn set_tri_amount(&mut self, tri: TriIdx, spec: SpecGIdx, amount: f64) -> Result<(), SimError> {
        if amount < 0.0 {
            return Err(SimError::NegativeValue {
                what: "amount",
                value: amount,
            });
        }
        self.set_tri_count(tri, spec, amount * AVOGADRO)
    }

    /// Clamp flag of a species on one triangle.
    pub fn tri_clamped(&self, tri: TriIdx, spec: SpecGIdx) -> Result<bool, SimError> {
        self.check_tri(tri)?;
        self.check_spec(spec)?;
        let slidx = self.tri_spec_lidx(tri, spec)?;
        Ok(self.tris[tri.index()].as_ref().expect("checked").clamped(slidx))
    }

    /// Clamp or unclamp a species on one triangle.
    pub fn set_tri_clamped(
        &mut self,
        tri: TriIdx,
        spec: SpecGIdx,
        clamp: bool,
    ) -> Result<(), SimError> {
        self.check_tri(tri)?;
        self.check_spec(spec)?;
        let slidx = self.tri_spec_lidx(tri, spec)?;
        self.tris[tri.index()]
            .as_mut()
            .expect("checked")
            .set_clamped(slidx, clamp);
        Ok(())
    }

    fn tri_sreac_lidx(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<SReacLIdx, SimError> {
        let t = self.tris[tri.index()].as_ref().expect("caller checked");
        self.statedef
            .patchdef(t.patchdef())
            .sreac_g2l(sreac)
            .ok_or_else(|| SimError::SReacUndefined {
                sreac: self.statedef.sreacdef(sreac).name().to_owned(),
                container: format!("triangle {tri}"),
            })
    }

    /// Rate constant of a surface reaction on one triangle.
    pub fn tri_sreac_k(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        let kidx = self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx);
        match &self.kprocs[kidx.index()].kind {
            KProcKind::SReac(sr) => Ok(sr.kcst()),
            _ => unreachable!("surface-reaction slot holds a surface reaction"),
        }
    }

    /// Set a surface reaction's rate constant on one triangle only,
    /// then refresh its propensity. The patch default is untouched.
    pub fn set_tri_sreac_k(&mut self, tri: TriIdx, sreac: SReacGIdx, kcst: f64) -> Result<(), SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        if kcst < 0.0 {
            return Err(SimError::NegativeValue {
                what: "surface reaction constant",
                value: kcst,
            });
        }
        self.set_tri_sreac_kcst_internal(tri, lsridx, kcst);
        let kidx = self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx);
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Whether a surface reaction is active on one triangle.
    pub fn tri_sreac_active(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<bool, SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        let kidx = self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx);
        Ok(self.kprocs[kidx.index()].active())
    }

    /// Activate or inactivate a surface reaction on one triangle,
    /// then refresh its propensity.
    pub fn set_tri_sreac_active(
        &mut self,
        tri: TriIdx,
        sreac: SReacGIdx,
        active: bool,
    ) -> Result<(), SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        let kidx = self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx);
        self.kprocs[kidx.index()].set_active(active);
        self.update_element(kidx);
        self.selector.recompute_total();
        Ok(())
    }

    /// Combinatorial part of a surface reaction's propensity on one
    /// triangle.
    pub fn tri_sreac_h(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        Ok(self.h_of(self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx)))
    }

    /// Mesoscopic constant of a surface reaction on one triangle.
    pub fn tri_sreac_c(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        let kidx = self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx);
        match &self.kprocs[kidx.index()].kind {
            KProcKind::SReac(sr) => Ok(sr.ccst()),
            _ => unreachable!("surface-reaction slot holds a surface reaction"),
        }
    }

    /// Propensity of a surface reaction on one triangle.
    pub fn tri_sreac_a(&self, tri: TriIdx, sreac: SReacGIdx) -> Result<f64, SimError> {
        self.check_tri(tri)?;
        self.check_sreac(sreac)?;
        let lsridx = self.tri_sreac_lidx(tri, sreac)?;
        Ok(self.rate_of(self.tris[tri.index()].as_ref().expect("checked").sreac(lsridx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_count_bounds() {
        assert!(Solver::check_count(0.0).is_ok());
        assert!(Solver::check_count(4.0e9).is_ok());
        assert!(matches!(
            Solver::check_count(-1.0),
            Err(SimError::NegativeValue { .. })
        ));
        assert!(matches!(
            Solver::check_count(5.0e9),
            Err(SimError::CountTooLarge { .. })
        ));
    }
}
