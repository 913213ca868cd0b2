//! Combination of upstream and downstream triplets into segments.
//!
//! 1. Every (upstream, downstream) triplet pair is tested against the slope
//!    cut and, at the mean z of the two triplets, the position cut. Accepted
//!    pairs are candidates and bump the match counter of both triplets.
//! 2. A candidate becomes a segment only if both of its triplets were matched
//!    exactly once in the event. Ambiguous triplets are dropped, never
//!    resolved by residual.
//! 3. With a field configured, the slope kink between the arms gives a
//!    single Gauss-Newton step on the curvature.

use log::trace;
use teltrack_core::config::{Cuts, RunParameters};
use teltrack_core::histogram::HistogramSink;
use teltrack_core::hit::{Point3, Xy};
use teltrack_core::statistics::ReconstructionStatistics;
use teltrack_core::track::{Segment, Triplet};

use crate::triplet::TripletStore;

/// A triplet pair that passed the slope and position cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    /// Index into the upstream store.
    pub upstream: usize,
    /// Index into the downstream store.
    pub downstream: usize,
    /// Upstream slope minus downstream slope.
    pub slope_delta: Xy,
    /// Upstream minus downstream position at `z_mean`.
    pub position_delta: Xy,
    /// Mean z of the two triplets.
    pub z_mean: f64,
}

/// Differences of a triplet pair that passed both cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMatch {
    /// Upstream slope minus downstream slope.
    pub slope_delta: Xy,
    /// Upstream minus downstream position at `z_mean`.
    pub position_delta: Xy,
    /// Mean z of the two triplets.
    pub z_mean: f64,
}

/// One-step curvature correction from the slope kink of two triplets.
///
/// With `der = bfac * (z_up - z_down)` this is
/// `(der.x * kink.x + der.y * kink.y) / (der.x^2 + der.y^2)`. Requires a
/// nonzero field and distinct triplet z.
#[must_use]
pub fn curvature_step(bfac: Xy, z_upstream: f64, z_downstream: f64, slope_delta: Xy) -> f64 {
    let dz = z_upstream - z_downstream;
    let der_x = bfac.x * dz;
    let der_y = bfac.y * dz;
    (der_x * slope_delta.x + der_y * slope_delta.y) / (der_x * der_x + der_y * der_y)
}

/// Pairs triplets of the two arms into segments.
#[derive(Clone, Debug)]
pub struct SegmentCombiner {
    /// Window on the slope difference (rejects above, equality passes).
    pub slope_cut: Xy,
    /// Window on the position difference (accepts strictly below).
    pub position_cut: Xy,
    /// Magnetic deflection factors.
    pub bfac: Xy,
    /// Curvature the triplets were built with.
    pub curvature: Xy,
}

impl SegmentCombiner {
    /// Creates a combiner from the cuts and run parameters.
    #[must_use]
    pub fn new(cuts: &Cuts, run: &RunParameters) -> Self {
        Self {
            slope_cut: cuts.slope,
            position_cut: cuts.position,
            bfac: run.bfac,
            curvature: run.initial_curvature(),
        }
    }

    /// Tests one triplet pair, returning the candidate if it passes both cuts.
    pub fn test_pair(
        &self,
        upstream: &Triplet,
        downstream: &Triplet,
        sink: &mut dyn HistogramSink,
    ) -> Option<PairMatch> {
        let slope_delta = upstream.slope - downstream.slope;
        sink.add_entry("segment_slope_dx", slope_delta.x);
        sink.add_entry("segment_slope_dy", slope_delta.y);
        if slope_delta.exceeds(self.slope_cut) {
            return None;
        }

        let z_mean = 0.5 * (upstream.position.z + downstream.position.z);
        let position_delta = upstream.extrapolate(z_mean) - downstream.extrapolate(z_mean);
        sink.add_entry("segment_position_dx", position_delta.x);
        sink.add_entry("segment_position_dy", position_delta.y);

        position_delta
            .strictly_within(self.position_cut)
            .then_some(PairMatch {
                slope_delta,
                position_delta,
                z_mean,
            })
    }

    /// Generates candidates and bumps the triplet match counters.
    pub fn find_candidates(
        &self,
        upstream: &mut TripletStore,
        downstream: &mut TripletStore,
        candidates: &mut Vec<CandidatePair>,
        sink: &mut dyn HistogramSink,
    ) {
        for (i, t0) in upstream.as_mut_slice().iter_mut().enumerate() {
            for (j, t1) in downstream.as_mut_slice().iter_mut().enumerate() {
                let Some(pair) = self.test_pair(t0, t1, sink) else {
                    continue;
                };
                t0.match_count += 1;
                t1.match_count += 1;
                candidates.push(CandidatePair {
                    upstream: i,
                    downstream: j,
                    slope_delta: pair.slope_delta,
                    position_delta: pair.position_delta,
                    z_mean: pair.z_mean,
                });
            }
        }
    }

    /// Curvature after the kink correction, unchanged with the field off.
    #[must_use]
    pub fn refine_curvature(
        &self,
        upstream: &Triplet,
        downstream: &Triplet,
        slope_delta: Xy,
        sink: &mut dyn HistogramSink,
    ) -> Xy {
        if self.bfac.is_zero() {
            return self.curvature;
        }
        let dqbyp = curvature_step(
            self.bfac,
            upstream.position.z,
            downstream.position.z,
            slope_delta,
        );
        sink.add_entry("segment_dqbyp", dqbyp);
        Xy::new(
            self.curvature.x + dqbyp * self.bfac.x,
            self.curvature.y + dqbyp * self.bfac.y,
        )
    }

    /// Runs candidate generation, uniqueness resolution and curvature
    /// refinement over the two arm stores.
    ///
    /// `candidates` is scratch space; it is cleared first.
    pub fn combine(
        &self,
        upstream: &mut TripletStore,
        downstream: &mut TripletStore,
        candidates: &mut Vec<CandidatePair>,
        stats: &mut ReconstructionStatistics,
        sink: &mut dyn HistogramSink,
    ) -> Vec<Segment> {
        candidates.clear();
        self.find_candidates(upstream, downstream, candidates, sink);
        stats.candidate_pairs += candidates.len();

        for triplet in upstream.iter().chain(downstream.iter()) {
            sink.add_entry("triplet_matches", f64::from(triplet.match_count));
            if triplet.match_count > 1 {
                stats.ambiguous_triplets += 1;
            }
        }

        let mut segments = Vec::new();
        for candidate in candidates.iter() {
            let t0 = &upstream[candidate.upstream];
            let t1 = &downstream[candidate.downstream];
            if t0.match_count != 1 || t1.match_count != 1 {
                continue;
            }

            let at_mean_0 = t0.extrapolate(candidate.z_mean);
            let at_mean_1 = t1.extrapolate(candidate.z_mean);
            let curvature = self.refine_curvature(t0, t1, candidate.slope_delta, sink);
            let [h0, h1, h2] = t0.hits;
            let [h3, h4, h5] = t1.hits;

            trace!(
                "segment from triplets ({}, {}): dslope=({:.3e}, {:.3e}) dpos=({:.3e}, {:.3e})",
                candidate.upstream,
                candidate.downstream,
                candidate.slope_delta.x,
                candidate.slope_delta.y,
                candidate.position_delta.x,
                candidate.position_delta.y
            );

            segments.push(Segment {
                hits: [h0, h1, h2, h3, h4, h5],
                triplets: [candidate.upstream, candidate.downstream],
                position: Point3::new(
                    0.5 * (at_mean_0.x + at_mean_1.x),
                    0.5 * (at_mean_0.y + at_mean_1.y),
                    candidate.z_mean,
                ),
                slope: Xy::new(
                    0.5 * (t0.slope.x + t1.slope.x),
                    0.5 * (t0.slope.y + t1.slope.y),
                ),
                curvature,
                dut_hits: Vec::new(),
                match_count: 0,
            });
        }

        stats.segments += segments.len();
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use teltrack_core::histogram::{HistogramCollector, NullSink};
    use teltrack_core::hit::Hit;

    fn triplet(x: f64, z: f64, slope_x: f64) -> Triplet {
        let hit = Hit::new(0, x, 0.0, z);
        Triplet {
            hits: [hit; 3],
            position: Point3::new(x, 0.0, z),
            slope: Xy::new(slope_x, 0.0),
            residual: Xy::ZERO,
            match_count: 0,
        }
    }

    fn combiner(slope_cut: Xy, position_cut: Xy) -> SegmentCombiner {
        SegmentCombiner {
            slope_cut,
            position_cut,
            bfac: Xy::ZERO,
            curvature: Xy::ZERO,
        }
    }

    fn store(triplets: &[Triplet]) -> TripletStore {
        let mut store = TripletStore::new();
        for t in triplets {
            store.push(*t);
        }
        store
    }

    #[test]
    fn test_position_cut_is_strict() {
        // Same slope, 0.2 apart at z_mean
        let up = triplet(0.0, 100.0, 0.0);
        let down = triplet(0.2, 500.0, 0.0);

        let on_cut = combiner(Xy::new(0.01, 0.01), Xy::new(0.2, 0.2));
        assert!(on_cut.test_pair(&up, &down, &mut NullSink).is_none());

        let wider = combiner(Xy::new(0.01, 0.01), Xy::new(0.2001, 0.2));
        let pair = wider.test_pair(&up, &down, &mut NullSink).unwrap();
        assert_relative_eq!(pair.position_delta.x, -0.2);
        assert_relative_eq!(pair.slope_delta.x, 0.0);
        assert_relative_eq!(pair.z_mean, 300.0);
    }

    #[test]
    fn test_slope_cut_is_inclusive() {
        let up = triplet(0.0, 100.0, 0.001);
        let down = triplet(0.0, 100.0, 0.0);

        let on_cut = combiner(Xy::new(0.001, 0.001), Xy::new(1.0, 1.0));
        assert!(on_cut.test_pair(&up, &down, &mut NullSink).is_some());

        let tighter = combiner(Xy::new(0.000_999, 0.001), Xy::new(1.0, 1.0));
        assert!(tighter.test_pair(&up, &down, &mut NullSink).is_none());
    }

    #[test]
    fn test_ambiguous_triplets_are_dropped() {
        // One upstream triplet compatible with two downstream ones
        let mut up = store(&[triplet(0.0, 100.0, 0.0), triplet(10.0, 100.0, 0.0)]);
        let mut down = store(&[
            triplet(0.0, 500.0, 0.0),
            triplet(0.05, 500.0, 0.0),
            triplet(10.0, 500.0, 0.0),
        ]);
        let mut candidates = Vec::new();
        let mut stats = ReconstructionStatistics::default();
        let mut sink = HistogramCollector::new();

        let segments = combiner(Xy::new(0.01, 0.01), Xy::new(0.1, 0.1)).combine(
            &mut up,
            &mut down,
            &mut candidates,
            &mut stats,
            &mut sink,
        );

        assert_eq!(candidates.len(), 3);
        assert_eq!(up[0].match_count, 2);
        assert_eq!(down[0].match_count, 1);
        assert_eq!(down[1].match_count, 1);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].triplets, [1, 2]);
        assert_eq!(stats.ambiguous_triplets, 1);
        assert_eq!(stats.candidate_pairs, 3);
        assert_eq!(stats.segments, 1);
        assert_eq!(sink.entries("triplet_matches"), 5);
    }

    #[test]
    fn test_curvature_unchanged_without_field() {
        let up = triplet(0.0, 100.0, 0.002);
        let down = triplet(0.0, 500.0, 0.001);
        let mut c = combiner(Xy::new(1.0, 1.0), Xy::new(10.0, 10.0));
        c.curvature = Xy::new(3e-6, -1e-6);

        let mut sink = HistogramCollector::new();
        let refined = c.refine_curvature(&up, &down, up.slope - down.slope, &mut sink);
        assert_eq!(refined, c.curvature);
        assert_eq!(sink.entries("segment_dqbyp"), 0);
    }

    #[test]
    fn test_curvature_step_closed_form() {
        let bfac = Xy::new(0.3, 0.4);
        let kink = Xy::new(-1.2e-3, -1.6e-3);
        // der = (-120, -160), |der|^2 = 40000, der . kink = 0.144 + 0.256
        let dqbyp = curvature_step(bfac, 100.0, 500.0, kink);
        assert_relative_eq!(dqbyp, 0.4 / 40000.0, epsilon = 1e-15);
    }
}
