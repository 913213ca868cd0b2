//! Association of DUT hits to finished segments.
//!
//! Every (DUT hit, segment) pair of the event is tested, over all DUT planes
//! at once. A hit is attached to a segment only when the pair is the single
//! candidate of both the hit and the segment, the same uniqueness rule the
//! segment combination uses. A segment with candidates on two DUT planes
//! therefore gets neither hit.

use teltrack_core::histogram::HistogramSink;
use teltrack_core::hit::{Hit, HitGroup, Xy};
use teltrack_core::statistics::ReconstructionStatistics;
use teltrack_core::track::Segment;

/// Attaches DUT hits to segments.
#[derive(Clone, Debug)]
pub struct DutMatcher {
    /// Window on the hit-to-segment residual (accepts strictly below).
    pub cut: Xy,
}

impl DutMatcher {
    /// Creates a matcher with the given window.
    #[must_use]
    pub fn new(cut: Xy) -> Self {
        Self { cut }
    }

    /// Matches a list of DUT hits against the segments in one pass.
    ///
    /// Segment match counters must start at zero; they hold the candidate
    /// counts afterwards. Returns the number of hits attached.
    pub fn match_candidates(
        &self,
        segments: &mut [Segment],
        hits: &[Hit],
        stats: &mut ReconstructionStatistics,
        sink: &mut dyn HistogramSink,
    ) -> usize {
        let mut hit_counts = vec![0u32; hits.len()];
        let mut candidates = Vec::new();

        for (h, hit) in hits.iter().enumerate() {
            for (s, segment) in segments.iter_mut().enumerate() {
                let residual = hit.position.xy() - segment.extrapolate(hit.z());
                sink.add_entry("dut_residual_x", residual.x);
                sink.add_entry("dut_residual_y", residual.y);

                if residual.strictly_within(self.cut) {
                    hit_counts[h] += 1;
                    segment.match_count += 1;
                    candidates.push((h, s));
                }
            }
        }
        stats.dut_candidates += candidates.len();

        for count in &hit_counts {
            sink.add_entry("dut_hit_matches", f64::from(*count));
        }
        for segment in segments.iter() {
            sink.add_entry("dut_segment_matches", f64::from(segment.match_count));
        }

        let mut attached = 0;
        for (h, s) in candidates {
            if hit_counts[h] == 1 && segments[s].match_count == 1 {
                segments[s].dut_hits.push(hits[h]);
                attached += 1;
            }
        }

        stats.dut_hits_attached += attached;
        attached
    }

    /// Matches the hits of every DUT plane of the event, in plane order.
    pub fn match_hits(
        &self,
        segments: &mut [Segment],
        hits: &HitGroup,
        stats: &mut ReconstructionStatistics,
        sink: &mut dyn HistogramSink,
    ) -> usize {
        if segments.is_empty() {
            return 0;
        }
        let dut_hits: Vec<Hit> = hits
            .dut_planes()
            .flat_map(|(_, plane_hits)| plane_hits.iter().copied())
            .collect();
        self.match_candidates(segments, &dut_hits, stats, sink)
    }
}
