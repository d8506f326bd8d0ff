//! Triangular surface element.

use tetkin_core::{KProcIdx, PatchGIdx, SReacLIdx, SpecLIdx, TetIdx, TriIdx};

/// One patch triangle: immutable area and volume links, mutable
/// per-species surface pools and clamp flags, and the surface-reaction
/// processes it owns in local index order.
///
/// Every patch triangle has an inner tetrahedron; the outer one is
/// absent on the mesh surface or when the outer side belongs to no
/// compartment.
#[derive(Clone, Debug)]
pub(crate) struct Tri {
    idx: TriIdx,
    patchdef: PatchGIdx,
    area: f64,
    inner_tet: TetIdx,
    outer_tet: Option<TetIdx>,
    pools: Vec<u32>,
    clamped: Vec<bool>,
    kprocs: Vec<KProcIdx>,
}

impl Tri {
    pub(crate) fn new(
        idx: TriIdx,
        patchdef: PatchGIdx,
        nspecs: usize,
        area: f64,
        inner_tet: TetIdx,
        outer_tet: Option<TetIdx>,
    ) -> Self {
        Self {
            idx,
            patchdef,
            area,
            inner_tet,
            outer_tet,
            pools: vec![0; nspecs],
            clamped: vec![false; nspecs],
            kprocs: Vec::new(),
        }
    }

    /// The patch this triangle belongs to.
    pub(crate) fn patchdef(&self) -> PatchGIdx {
        self.patchdef
    }

    /// Area, in square metres.
    pub(crate) fn area(&self) -> f64 {
        self.area
    }

    /// The inner tetrahedron.
    pub(crate) fn inner_tet(&self) -> TetIdx {
        self.inner_tet
    }

    /// The outer tetrahedron, if any.
    pub(crate) fn outer_tet(&self) -> Option<TetIdx> {
        self.outer_tet
    }

    /// Per-species surface counts, over patch-local species.
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
    /// Panics if the count would go negative.
    pub(crate) fn inc_count(&mut self, spec: SpecLIdx, delta: i64) {
        let cur = i64::from(self.pools[spec.index()]);
        let next = cur + delta;
        assert!(
            next >= 0,
            "count of local species {} on triangle {} went negative ({} {:+})",
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

    /// Record an owned surface-reaction process.
    pub(crate) fn add_sreac(&mut self, kproc: KProcIdx) {
        self.kprocs.push(kproc);
    }

    /// The kinetic process of a local surface reaction.
    pub(crate) fn sreac(&self, sreac: SReacLIdx) -> KProcIdx {
        self.kprocs[sreac.index()]
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
