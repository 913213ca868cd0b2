//! Per-event and per-run reconstruction counters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters collected while reconstructing events.
///
/// Arm-indexed fields use index 0 for the upstream arm and 1 for the
/// downstream arm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionStatistics {
    /// Events processed.
    pub events: usize,
    /// Hits seen, telescope and DUT.
    pub hits: usize,
    /// Outer-hit pairs tested against the doublet cut.
    pub doublets_tested: [usize; 2],
    /// Outer-hit pairs passing the doublet cut.
    pub doublets_accepted: [usize; 2],
    /// Triplets found.
    pub triplets: [usize; 2],
    /// Triplet pairs passing slope and position cuts.
    pub candidate_pairs: usize,
    /// Segments promoted.
    pub segments: usize,
    /// Triplets dropped because they paired more than once.
    pub ambiguous_triplets: usize,
    /// (DUT hit, segment) pairs passing the DUT cut.
    pub dut_candidates: usize,
    /// DUT hits attached to a segment.
    pub dut_hits_attached: usize,
}

impl ReconstructionStatistics {
    /// Adds the counters of another run or event.
    pub fn merge(&mut self, other: &ReconstructionStatistics) {
        self.events += other.events;
        self.hits += other.hits;
        for arm in 0..2 {
            self.doublets_tested[arm] += other.doublets_tested[arm];
            self.doublets_accepted[arm] += other.doublets_accepted[arm];
            self.triplets[arm] += other.triplets[arm];
        }
        self.candidate_pairs += other.candidate_pairs;
        self.segments += other.segments;
        self.ambiguous_triplets += other.ambiguous_triplets;
        self.dut_candidates += other.dut_candidates;
        self.dut_hits_attached += other.dut_hits_attached;
    }
}
