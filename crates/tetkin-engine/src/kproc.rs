//! Kinetic processes: the elementary events of the simulation.
//!
//! Every event the selector can fire is a [`KProc`]: a volume reaction
//! in one tetrahedron, a surface reaction on one triangle, or the
//! diffusion of one species out of one tetrahedron. The three variants
//! form a closed set, so they are a tagged enum rather than trait
//! objects; rate and apply semantics that need the surrounding state
//! live on the solver, which owns the arenas the variants index into.

use crate::diff::Diff;
use crate::reac::Reac;
use crate::sreac::SReac;

/// Where a kinetic process currently sits in the composition-rejection
/// selector.
///
/// `pow` and `pos` are meaningful only while `recorded` is set; `rate`
/// is the propensity the selector last absorbed, which lags the true
/// propensity between an apply and the following refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct CrRecord {
    pub recorded: bool,
    pub pow: i32,
    pub pos: u32,
    pub rate: f64,
}

/// Variant payload of a kinetic process.
#[derive(Clone, Debug)]
pub(crate) enum KProcKind {
    /// Volume reaction in one tetrahedron.
    Reac(Reac),
    /// Surface reaction on one triangle.
    SReac(SReac),
    /// Diffusion of one species out of one tetrahedron.
    Diff(Diff),
}

/// One elementary event: selector record, activity flag, firing
/// counter, and the variant payload.
#[derive(Clone, Debug)]
pub(crate) struct KProc {
    pub cr: CrRecord,
    active: bool,
    extent: u64,
    pub kind: KProcKind,
}

impl KProc {
    pub(crate) fn new(kind: KProcKind) -> Self {
        Self {
            cr: CrRecord::default(),
            active: true,
            extent: 0,
            kind,
        }
    }

    /// Whether this process may fire. Inactive processes have rate 0
    /// regardless of counts.
    pub(crate) fn active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Cumulative number of firings since construction or last reset.
    pub(crate) fn extent(&self) -> u64 {
        self.extent
    }

    pub(crate) fn inc_extent(&mut self) {
        self.extent += 1;
    }

    pub(crate) fn reset_extent(&mut self) {
        self.extent = 0;
    }

    /// Clear selector record and extent, reactivate.
    pub(crate) fn reset_common(&mut self) {
        self.cr = CrRecord::default();
        self.active = true;
        self.extent = 0;
    }
}

/// Falling-factorial combinatorial factor for one reactant:
/// `cnt * (cnt-1) * ... * (cnt-lhs+1)`.
///
/// Zero when fewer than `lhs` molecules are present. Multiplicities
/// above four are rejected at model compilation, so this never sees
/// them.
#[inline]
pub(crate) fn comb_factor(cnt: u32, lhs: u32) -> f64 {
    debug_assert!((1..=4).contains(&lhs));
    if cnt < lhs {
        return 0.0;
    }
    let c = f64::from(cnt);
    match lhs {
        1 => c,
        2 => c * (c - 1.0),
        3 => c * (c - 1.0) * (c - 2.0),
        _ => c * (c - 1.0) * (c - 2.0) * (c - 3.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comb_factor_counts_ordered_tuples() {
        assert_eq!(comb_factor(10, 1), 10.0);
        assert_eq!(comb_factor(10, 2), 90.0);
        assert_eq!(comb_factor(10, 3), 720.0);
        assert_eq!(comb_factor(10, 4), 5040.0);
    }

    #[test]
    fn comb_factor_vanishes_below_multiplicity() {
        assert_eq!(comb_factor(0, 1), 0.0);
        assert_eq!(comb_factor(1, 2), 0.0);
        assert_eq!(comb_factor(3, 4), 0.0);
    }
}
