//! Triplet finding within one telescope arm.
//!
//! Every (outer, far) hit pair of an arm is turned into a doublet. Pairs
//! whose raw offsets pass the doublet cut are tested against every hit on
//! the middle plane, and each middle hit within the triplet cut yields one
//! triplet. The search is O(n1 * n3 * n2) per arm; the doublet cut bounds
//! the inner loop.

use teltrack_core::config::{Cuts, RunParameters};
use teltrack_core::histogram::HistogramSink;
use teltrack_core::hit::{HitGroup, Xy};
use teltrack_core::statistics::ReconstructionStatistics;
use teltrack_core::track::{Arm, Triplet};

use crate::doublet::{build_doublet, match_middle_hit};

/// Raw doublet offset histograms, per arm.
const DOUBLET_HISTOGRAMS: [[&str; 2]; 2] = [
    ["arm0_doublet_dx", "arm0_doublet_dy"],
    ["arm1_doublet_dx", "arm1_doublet_dy"],
];

/// Triplet candidates of one arm for the current event.
#[derive(Debug, Clone, Default)]
pub struct TripletStore {
    triplets: Vec<Triplet>,
}

impl TripletStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triplet.
    pub fn push(&mut self, triplet: Triplet) {
        self.triplets.push(triplet);
    }

    /// Removes all triplets, keeping the allocation.
    pub fn clear(&mut self) {
        self.triplets.clear();
    }

    /// Number of triplets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    /// Whether the store holds no triplets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }

    /// Triplets in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Triplet] {
        &self.triplets
    }

    /// Mutable access, used to bump match counters.
    pub fn as_mut_slice(&mut self) -> &mut [Triplet] {
        &mut self.triplets
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Triplet> {
        self.triplets.iter()
    }
}

impl std::ops::Index<usize> for TripletStore {
    type Output = Triplet;

    fn index(&self, index: usize) -> &Triplet {
        &self.triplets[index]
    }
}

/// Builds triplets from the hits of one arm.
#[derive(Clone, Debug)]
pub struct TripletFinder {
    /// Window on the raw doublet offsets.
    pub doublet_cut: Xy,
    /// Window on the middle-hit residual.
    pub triplet_cut: Xy,
    /// Curvature assumed for the sagitta correction.
    pub curvature: Xy,
    /// z where the field begins.
    pub z_mag: f64,
}

impl TripletFinder {
    /// Creates a finder from the cuts and the run's initial curvature.
    #[must_use]
    pub fn new(cuts: &Cuts, run: &RunParameters) -> Self {
        Self {
            doublet_cut: cuts.doublet,
            triplet_cut: cuts.triplet,
            curvature: run.initial_curvature(),
            z_mag: run.z_mag,
        }
    }

    /// Finds all triplets of `arm` and appends them to `store`.
    ///
    /// Returns the number of triplets added.
    pub fn find(
        &self,
        arm: Arm,
        hits: &HitGroup,
        store: &mut TripletStore,
        stats: &mut ReconstructionStatistics,
        sink: &mut dyn HistogramSink,
    ) -> usize {
        let [outer, middle, far] = arm.planes();
        let [name_dx, name_dy] = DOUBLET_HISTOGRAMS[arm.index()];
        let before = store.len();

        for hit1 in hits.plane(outer) {
            for hit3 in hits.plane(far) {
                let doublet = build_doublet(hit1, hit3, self.curvature, self.z_mag);
                stats.doublets_tested[arm.index()] += 1;
                sink.add_entry(name_dx, doublet.raw_delta.x);
                sink.add_entry(name_dy, doublet.raw_delta.y);

                if doublet.raw_delta.exceeds(self.doublet_cut) {
                    continue;
                }
                stats.doublets_accepted[arm.index()] += 1;

                for hit2 in hits.plane(middle) {
                    if let Some(residual) =
                        match_middle_hit(arm, &doublet, hit2, self.triplet_cut, sink)
                    {
                        store.push(Triplet::new(*hit1, *hit2, *hit3, &doublet, residual));
                    }
                }
            }
        }

        let found = store.len() - before;
        stats.triplets[arm.index()] += found;
        found
    }
}
