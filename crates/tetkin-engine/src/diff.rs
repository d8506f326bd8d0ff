//! Diffusion of one species out of one tetrahedron.

use tetkin_core::{DiffGIdx, DiffLIdx, KProcIdx, SpecGIdx, SpecLIdx, TetIdx};

use crate::tet::Tet;

/// One diffusion channel: a ligand species leaving one tetrahedron
/// through any of its four faces.
///
/// Each face carries a scaled transfer coefficient
/// `d[i] = area[i] * D / (vol * dist[i])`, zero where no neighbour is
/// reachable. A face on a diffusion boundary contributes only while
/// transport of this species across the boundary is active. The total
/// `scaled_dcst` and the three-entry cumulative selector over the four
/// directions are rebuilt whenever `D` or a boundary flag changes.
///
/// The update lists are per-direction: a hop into neighbour `k`
/// invalidates processes around the source and around destination `k`
/// only.
#[derive(Clone, Debug)]
pub(crate) struct Diff {
    ddef: DiffGIdx,
    lidx: DiffLIdx,
    tet: TetIdx,
    lig: SpecGIdx,
    lidx_tet: SpecLIdx,
    dcst: f64,
    scaled_dcst: f64,
    cdf: [f64; 3],
    /// Whether face `i` carries a strictly positive coefficient.
    /// Kept alongside the selector because rounding in the cumulative
    /// sums must never route a hop through a closed face.
    open: [bool; 4],
    neighb_lidx: [Option<SpecLIdx>; 4],
    bnd_direction: [bool; 4],
    bnd_active: [bool; 4],
    upd: [Vec<KProcIdx>; 4],
}

impl Diff {
    pub(crate) fn new(
        ddef: DiffGIdx,
        lidx: DiffLIdx,
        lig: SpecGIdx,
        lidx_tet: SpecLIdx,
        tet: &Tet,
        neighb_lidx: [Option<SpecLIdx>; 4],
        dcst: f64,
    ) -> Self {
        let mut diff = Self {
            ddef,
            lidx,
            tet: tet.idx(),
            lig,
            lidx_tet,
            dcst,
            scaled_dcst: 0.0,
            cdf: [0.0; 3],
            open: [false; 4],
            neighb_lidx,
            bnd_direction: [
                tet.diff_bnd_direction(0),
                tet.diff_bnd_direction(1),
                tet.diff_bnd_direction(2),
                tet.diff_bnd_direction(3),
            ],
            bnd_active: [false; 4],
            upd: Default::default(),
        };
        diff.set_dcst(dcst, tet);
        diff
    }

    pub(crate) fn lidx(&self) -> DiffLIdx {
        self.lidx
    }

    pub(crate) fn tet(&self) -> TetIdx {
        self.tet
    }

    /// The diffusing species, by global index.
    pub(crate) fn lig(&self) -> SpecGIdx {
        self.lig
    }

    /// The diffusing species, local to the source compartment.
    pub(crate) fn lidx_tet(&self) -> SpecLIdx {
        self.lidx_tet
    }

    /// The ligand's local index in the compartment behind face `i`.
    pub(crate) fn neighb_lidx(&self, i: usize) -> Option<SpecLIdx> {
        self.neighb_lidx[i]
    }

    pub(crate) fn dcst(&self) -> f64 {
        self.dcst
    }

    pub(crate) fn scaled_dcst(&self) -> f64 {
        self.scaled_dcst
    }

    pub(crate) fn cdf(&self) -> [f64; 3] {
        self.cdf
    }

    /// Rebuild the per-face coefficients, their sum, and the selector.
    pub(crate) fn set_dcst(&mut self, dcst: f64, tet: &Tet) {
        debug_assert!(dcst >= 0.0);
        self.dcst = dcst;

        let mut d = [0.0; 4];
        for i in 0..4 {
            let dist = tet.dist(i);
            if dist > 0.0 && tet.next_tet(i).is_some() {
                let open = !self.bnd_direction[i] || self.bnd_active[i];
                if open {
                    d[i] = (tet.area(i) * dcst) / (tet.vol() * dist);
                }
            }
        }

        self.scaled_dcst = d[0] + d[1] + d[2] + d[3];
        debug_assert!(self.scaled_dcst >= 0.0);
        for i in 0..4 {
            self.open[i] = d[i] > 0.0;
        }

        if self.scaled_dcst == 0.0 {
            self.cdf = [0.0; 3];
        } else {
            self.cdf[0] = d[0] / self.scaled_dcst;
            self.cdf[1] = self.cdf[0] + d[1] / self.scaled_dcst;
            self.cdf[2] = self.cdf[1] + d[2] / self.scaled_dcst;
        }
    }

    /// Whether face `i` lies on a diffusion boundary.
    pub(crate) fn bnd_direction(&self, i: usize) -> bool {
        self.bnd_direction[i]
    }

    /// Whether transport across boundary face `i` is active.
    pub(crate) fn bnd_active(&self, i: usize) -> bool {
        debug_assert!(self.bnd_direction[i]);
        self.bnd_active[i]
    }

    /// Enable or disable transport across boundary face `i`.
    pub(crate) fn set_bnd_active(&mut self, i: usize, active: bool, tet: &Tet) {
        debug_assert!(self.bnd_direction[i]);
        if self.bnd_active[i] != active {
            self.bnd_active[i] = active;
            self.set_dcst(self.dcst, tet);
        }
    }

    /// Reset support: disable every boundary face and restore a
    /// default constant. Boundary transport is always off after a
    /// reset.
    pub(crate) fn reset_to(&mut self, dcst: f64, tet: &Tet) {
        self.bnd_active = [false; 4];
        self.set_dcst(dcst, tet);
    }

    /// Install checkpointed selector values verbatim; the open flags
    /// are re-derived from the geometry and the restored boundary
    /// flags rather than from the rounded cumulative sums.
    pub(crate) fn restore_checkpointed(
        &mut self,
        scaled_dcst: f64,
        dcst: f64,
        cdf: [f64; 3],
        bnd_active: [bool; 4],
        tet: &Tet,
    ) {
        self.scaled_dcst = scaled_dcst;
        self.dcst = dcst;
        self.cdf = cdf;
        self.bnd_active = bnd_active;
        for i in 0..4 {
            self.open[i] = dcst > 0.0
                && tet.dist(i) > 0.0
                && tet.next_tet(i).is_some()
                && (!self.bnd_direction[i] || self.bnd_active[i]);
        }
    }

    pub(crate) fn set_upd(&mut self, dir: usize, upd: Vec<KProcIdx>) {
        self.upd[dir] = upd;
    }

    pub(crate) fn upd(&self, dir: usize) -> &[KProcIdx] {
        &self.upd[dir]
    }

    /// Propensity: `scaled_dcst * count`, or 0 while inactive.
    pub(crate) fn rate(&self, active: bool, tet: &Tet) -> f64 {
        if !active {
            return 0.0;
        }
        let rate = self.scaled_dcst * f64::from(tet.pool(self.lidx_tet));
        debug_assert!(!rate.is_nan());
        rate
    }

    /// Map a uniform draw on (0, 1) to an outgoing direction.
    ///
    /// A draw below a cumulative entry can only land on a closed face
    /// if its coefficient is zero, in which case the entry equals the
    /// previous one and an earlier branch already caught the draw. The
    /// terminal case is the delicate one: rounding in the cumulative
    /// sums can push a draw past `cdf[2]` even when face 3 is closed,
    /// so the fall-through takes face 3 only when it is open and
    /// otherwise lands on the smallest open face. With
    /// `scaled_dcst > 0` at least one face is open.
    pub(crate) fn pick_direction(&self, sel: f64) -> usize {
        if sel < self.cdf[0] {
            return 0;
        }
        if sel < self.cdf[1] {
            return 1;
        }
        if sel < self.cdf[2] {
            return 2;
        }
        if self.open[3] {
            return 3;
        }
        if let Some(dir) = self.open.iter().position(|&o| o) {
            return dir;
        }
        panic!(
            "diffusion {} in tetrahedron {} fired with no open direction (cdf {:?})",
            self.ddef, self.tet, self.cdf,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetkin_core::CompGIdx;

    fn source_tet(neighbours: [Option<TetIdx>; 4]) -> Tet {
        let mut tet = Tet::new(
            TetIdx(0),
            CompGIdx(0),
            1,
            1.0e-18,
            [1.0e-12; 4],
            [1.0e-6; 4],
        );
        for (i, n) in neighbours.into_iter().enumerate() {
            if let Some(n) = n {
                tet.set_next_tet(i, n);
            }
        }
        tet
    }

    fn diff_in(tet: &Tet) -> Diff {
        Diff::new(
            DiffGIdx(0),
            DiffLIdx(0),
            SpecGIdx(0),
            SpecLIdx(0),
            tet,
            [Some(SpecLIdx(0)); 4],
            1.0e-12,
        )
    }

    #[test]
    fn isolated_tet_has_zero_selector() {
        let tet = source_tet([None; 4]);
        let d = diff_in(&tet);
        assert_eq!(d.scaled_dcst(), 0.0);
        assert_eq!(d.cdf(), [0.0; 3]);
        assert_eq!(d.rate(true, &tet), 0.0);
    }

    #[test]
    fn cdf_is_monotone_and_bounded() {
        let tet = source_tet([Some(TetIdx(1)), Some(TetIdx(2)), None, None]);
        let d = diff_in(&tet);
        let cdf = d.cdf();
        assert!(cdf[0] > 0.0);
        assert!(cdf[0] <= cdf[1]);
        assert!(cdf[1] <= cdf[2]);
        assert!(cdf[2] <= 1.0);
        // Both open faces have equal geometry, so each takes half.
        assert!((cdf[0] - 0.5).abs() < 1.0e-12);
        assert!((cdf[2] - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn fall_through_avoids_closed_direction_three() {
        let tet = source_tet([Some(TetIdx(1)), None, None, None]);
        let d = diff_in(&tet);
        // All the weight is on direction 0; a draw at the very top of
        // the unit interval must still land there.
        assert_eq!(d.pick_direction(0.999_999_999), 0);

        // Three open faces of equal weight: the cumulative sums round
        // to just below 1, so a draw above cdf[2] exists even though
        // face 3 is closed. It must land on an open face.
        let tet3 = source_tet([Some(TetIdx(1)), Some(TetIdx(2)), Some(TetIdx(3)), None]);
        let d3 = diff_in(&tet3);
        let cdf = d3.cdf();
        if cdf[2] < 1.0 {
            let sel = (cdf[2] + 1.0) / 2.0;
            assert_eq!(d3.pick_direction(sel), 0);
        }
    }

    #[test]
    fn sole_open_face_three_is_reachable() {
        let tet = source_tet([None, None, None, Some(TetIdx(1))]);
        let d = diff_in(&tet);
        assert_eq!(d.cdf(), [0.0; 3]);
        assert!(d.scaled_dcst() > 0.0);
        assert_eq!(d.pick_direction(0.5), 3);
    }

    #[test]
    fn boundary_face_closed_until_activated() {
        let mut tet = source_tet([Some(TetIdx(1)), Some(TetIdx(2)), None, None]);
        tet.set_diff_bnd_direction(1);
        let mut d = diff_in(&tet);
        let open_only = d.scaled_dcst();
        assert!(open_only > 0.0);
        // Face 1 contributes nothing while inactive.
        assert!((d.cdf()[0] - 1.0).abs() < 1.0e-12);

        d.set_bnd_active(1, true, &tet);
        assert!((d.scaled_dcst() - 2.0 * open_only).abs() < 1.0e-12 * open_only);
        assert!((d.cdf()[0] - 0.5).abs() < 1.0e-12);

        d.reset_to(d.dcst(), &tet);
        assert!((d.cdf()[0] - 1.0).abs() < 1.0e-12);
    }
}
