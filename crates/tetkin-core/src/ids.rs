//! Strongly-typed index families.
//!
//! Global indices (`*GIdx`) identify a definition within the compiled
//! state: species, reactions, surface reactions, diffusion rules,
//! compartments, patches, diffusion boundaries. Mesh indices (`TetIdx`,
//! `TriIdx`) identify voxels and facets in mesh numbering. `KProcIdx`
//! identifies a kinetic process in scheduler order.
//!
//! Local indices (`*LIdx`) are per-compartment or per-patch positions
//! assigned when the state definition freezes. A species that is not
//! defined in a container has no local index there; lookup tables
//! return `Option<SpecLIdx>` and callers must check before indexing.

use std::fmt;

macro_rules! index_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// The index as a `usize`, for direct slice indexing.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self(v as u32)
            }
        }
    };
}

index_type!(
    /// Global species index.
    SpecGIdx
);
index_type!(
    /// Global volume-reaction index.
    ReacGIdx
);
index_type!(
    /// Global surface-reaction index.
    SReacGIdx
);
index_type!(
    /// Global diffusion-rule index.
    DiffGIdx
);
index_type!(
    /// Global compartment index.
    CompGIdx
);
index_type!(
    /// Global patch index.
    PatchGIdx
);
index_type!(
    /// Global diffusion-boundary index.
    DiffBndGIdx
);

index_type!(
    /// Tetrahedron index in mesh numbering.
    TetIdx
);
index_type!(
    /// Triangle index in mesh numbering.
    TriIdx
);
index_type!(
    /// Kinetic-process index in scheduler order.
    KProcIdx
);

index_type!(
    /// Species index local to one compartment or patch.
    SpecLIdx
);
index_type!(
    /// Reaction index local to one compartment.
    ReacLIdx
);
index_type!(
    /// Surface-reaction index local to one patch.
    SReacLIdx
);
index_type!(
    /// Diffusion-rule index local to one compartment.
    DiffLIdx
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_number() {
        assert_eq!(SpecGIdx(7).to_string(), "7");
        assert_eq!(TetIdx(0).to_string(), "0");
    }

    #[test]
    fn index_round_trips() {
        let k = KProcIdx::from(12usize);
        assert_eq!(k.index(), 12);
        assert_eq!(KProcIdx(12), k);
    }
}
