//! Tetrahedral volume element.

use tetkin_core::{CompGIdx, DiffLIdx, KProcIdx, ReacLIdx, SpecLIdx, TetIdx, TriIdx};

/// One tetrahedron: immutable geometry and neighbourhood, mutable
/// per-species pools and clamp flags, and the kinetic processes it
/// owns (its reactions first, then its diffusion rules, both in local
/// index order).
///
/// Cross-references are mesh indices into the solver's arenas, not
/// pointers; a neighbour link is present only when the neighbour
/// element was itself instantiated, and volume neighbours across a
/// compartment border are kept only where a diffusion boundary face
/// joins them.
///
/// Count mutation does not touch propensities (the solver refreshes
/// the selector after every apply), and the solver keeps the def-level
/// aggregate pools in sync with per-voxel mutations.
#[derive(Clone, Debug)]
pub(crate) struct Tet {
    idx: TetIdx,
    compdef: CompGIdx,
    vol: f64,
    areas: [f64; 4],
    dists: [f64; 4],
    next_tet: [Option<TetIdx>; 4],
    next_tri: [Option<TriIdx>; 4],
    diff_bnd_direction: [bool; 4],
    pools: Vec<u32>,
    clamped: Vec<bool>,
    kprocs: Vec<KProcIdx>,
    n_reacs: usize,
}

impl Tet {
    pub(crate) fn new(
        idx: TetIdx,
        compdef: CompGIdx,
        nspecs: usize,
        vol: f64,
        areas: [f64; 4],
        dists: [f64; 4],
    ) -> Self {
        Self {
            idx,
            compdef,
            vol,
            areas,
            dists,
            next_tet: [None; 4],
            next_tri: [None; 4],
            diff_bnd_direction: [false; 4],
            pools: vec![0; nspecs],
            clamped: vec![false; nspecs],
            kprocs: Vec::new(),
            n_reacs: 0,
        }
    }

    /// Mesh index of this tetrahedron.
    pub(crate) fn idx(&self) -> TetIdx {
        self.idx
    }

    /// The compartment this tetrahedron belongs to.
    pub(crate) fn compdef(&self) -> CompGIdx {
        self.compdef
    }

    /// Volume, in cubic metres.
    pub(crate) fn vol(&self) -> f64 {
        self.vol
    }

    /// Area of face `i`.
    pub(crate) fn area(&self, i: usize) -> f64 {
        self.areas[i]
    }

    /// Barycenter distance to neighbour `i`.
    pub(crate) fn dist(&self, i: usize) -> f64 {
        self.dists[i]
    }

    /// Volume neighbour behind face `i`, if diffusion can reach it.
    pub(crate) fn next_tet(&self, i: usize) -> Option<TetIdx> {
        self.next_tet[i]
    }

    /// Surface facet attached to slot `i`, if any.
    pub(crate) fn next_tri(&self, i: usize) -> Option<TriIdx> {
        self.next_tri[i]
    }

    pub(crate) fn set_next_tet(&mut self, i: usize, tet: TetIdx) {
        self.next_tet[i] = Some(tet);
    }

    pub(crate) fn set_next_tri(&mut self, i: usize, tri: TriIdx) {
        self.next_tri[i] = Some(tri);
    }

    /// Whether face `i` lies on a diffusion boundary.
    pub(crate) fn diff_bnd_direction(&self, i: usize) -> bool {
        self.diff_bnd_direction[i]
    }

    pub(crate) fn set_diff_bnd_direction(&mut self, i: usize) {
        self.diff_bnd_direction[i] = true;
    }

    /// Per-species counts, over compartment-local species.
    pub(crate) fn pools(&self) -> &[u32] {
        &self.pools
    }

    /// Count of one local species.
    pub(crate) fn pool(&self, spec: SpecLIdx) -> u32 {
        self.pools[spec.index()]
    }

    /// Overwrite the count of one local species. Returns the signed
    /// change, so the caller can keep aggregates in sync.
    pub(crate) fn set_count(&mut self, spec: SpecLIdx, count: u32) -> f64 {
        let old = self.pools[spec.index()];
        self.pools[spec.index()] = count;
        f64::from(count) - f64::from(old)
    }

    /// Add `delta` to the count of one local species.
    ///
    /// Panics if the count would go negative: events only fire with
    /// sufficient reactants, so a negative count is an internal error.
    pub(crate) fn inc_count(&mut self, spec: SpecLIdx, delta: i64) {
        let cur = i64::from(self.pools[spec.index()]);
        let next = cur + delta;
        assert!(
            next >= 0,
            "count of local species {} in tetrahedron {} went negative ({} {:+})",
            spec,
            self.idx,
            cur,
            delta,
        );
        self.pools[spec.index()] = next as u32;
    }

    /// Clamp flag of one local species.
    pub(crate) fn clamped(&self, spec: SpecLIdx) -> bool {
        self.clamped[spec.index()]
    }

    pub(crate) fn set_clamped(&mut self, spec: SpecLIdx, clamp: bool) {
        self.clamped[spec.index()] = clamp;
    }

    /// Record an owned kinetic process. Reactions must be added before
    /// diffusion rules.
    pub(crate) fn add_reac(&mut self, kproc: KProcIdx) {
        debug_assert_eq!(self.kprocs.len(), self.n_reacs, "reacs added after diffs");
        self.kprocs.push(kproc);
        self.n_reacs += 1;
    }

    pub(crate) fn add_diff(&mut self, kproc: KProcIdx) {
        self.kprocs.push(kproc);
    }

    /// The kinetic process of a local reaction.
    pub(crate) fn reac(&self, reac: ReacLIdx) -> KProcIdx {
        self.kprocs[reac.index()]
    }

    /// The kinetic process of a local diffusion rule.
    pub(crate) fn diff(&self, diff: DiffLIdx) -> KProcIdx {
        self.kprocs[self.n_reacs + diff.index()]
    }

    /// All owned kinetic processes.
    pub(crate) fn kprocs(&self) -> &[KProcIdx] {
        &self.kprocs
    }

    /// Zero pools and clear clamp flags.
    pub(crate) fn reset(&mut self) {
        self.pools.fill(0);
        self.clamped.fill(false);
    }
}
