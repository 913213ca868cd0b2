//! Per-event reconstruction pipeline and run-level helpers.

use log::debug;
use rayon::prelude::*;
use teltrack_core::config::TrackingConfig;
use teltrack_core::histogram::{HistogramCollector, HistogramSink, NullSink};
use teltrack_core::hit::{Event, EventHeader, Hit, HitGroup};
use teltrack_core::statistics::ReconstructionStatistics;
use teltrack_core::track::{Arm, Segment};

use crate::dut::DutMatcher;
use crate::segment::{CandidatePair, SegmentCombiner};
use crate::triplet::{TripletFinder, TripletStore};

/// Per-event buffers, reset at the start of every event.
#[derive(Debug, Default)]
pub struct ReconstructionState {
    hits: HitGroup,
    triplets: [TripletStore; 2],
    candidates: Vec<CandidatePair>,
}

impl ReconstructionState {
    /// Drops everything left over from the previous event.
    pub fn reset(&mut self) {
        self.hits.clear();
        for store in &mut self.triplets {
            store.clear();
        }
        self.candidates.clear();
    }

    /// Triplets of an arm from the last reconstructed event.
    #[must_use]
    pub fn triplets(&self, arm: Arm) -> &TripletStore {
        &self.triplets[arm.index()]
    }

    /// Candidate pairs from the last reconstructed event.
    #[must_use]
    pub fn candidates(&self) -> &[CandidatePair] {
        &self.candidates
    }
}

/// Result of reconstructing one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventReconstruction {
    /// Run and event numbers.
    pub header: EventHeader,
    /// Segments in candidate order.
    pub segments: Vec<Segment>,
    /// Counters of this event.
    pub statistics: ReconstructionStatistics,
}

/// Result of reconstructing a sequence of events.
#[derive(Debug, Clone, Default)]
pub struct RunReconstruction {
    /// Per-event results, in input order.
    pub events: Vec<EventReconstruction>,
    /// Counters summed over all events.
    pub statistics: ReconstructionStatistics,
    /// Monitoring histograms summed over all events (empty if not requested).
    pub histograms: HistogramCollector,
}

/// The complete track finder for one configuration.
#[derive(Clone, Debug)]
pub struct TrackReconstructor {
    config: TrackingConfig,
    finder: TripletFinder,
    combiner: SegmentCombiner,
    dut: Option<DutMatcher>,
}

impl TrackReconstructor {
    /// Creates a reconstructor; DUT matching is enabled by the DUT cut.
    #[must_use]
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            finder: TripletFinder::new(&config.cuts, &config.run),
            combiner: SegmentCombiner::new(&config.cuts, &config.run),
            dut: config.cuts.dut.map(DutMatcher::new),
            config,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Creates reusable per-event buffers.
    #[must_use]
    pub fn create_state(&self) -> ReconstructionState {
        ReconstructionState::default()
    }

    /// Reconstructs the segments of one event.
    pub fn reconstruct(
        &self,
        header: EventHeader,
        hits: &[Hit],
        state: &mut ReconstructionState,
        sink: &mut dyn HistogramSink,
    ) -> EventReconstruction {
        state.reset();
        state.hits.extend(hits);

        let mut statistics = ReconstructionStatistics {
            events: 1,
            hits: hits.len(),
            ..Default::default()
        };

        for arm in Arm::ALL {
            self.finder.find(
                arm,
                &state.hits,
                &mut state.triplets[arm.index()],
                &mut statistics,
                sink,
            );
        }

        let [upstream, downstream] = &mut state.triplets;
        let mut segments = self.combiner.combine(
            upstream,
            downstream,
            &mut state.candidates,
            &mut statistics,
            sink,
        );

        if let Some(dut) = &self.dut {
            dut.match_hits(&mut segments, &state.hits, &mut statistics, sink);
        }

        debug!(
            "run {} event {}: {} hits, triplets {:?}, {} candidates, {} segments, {} DUT hits",
            header.run,
            header.event,
            statistics.hits,
            statistics.triplets,
            statistics.candidate_pairs,
            statistics.segments,
            statistics.dut_hits_attached
        );

        EventReconstruction {
            header,
            segments,
            statistics,
        }
    }
}

/// Reconstructs a single event with a fresh state.
pub fn reconstruct_event(
    event: &Event,
    config: &TrackingConfig,
    sink: &mut dyn HistogramSink,
) -> EventReconstruction {
    let reconstructor = TrackReconstructor::new(*config);
    let mut state = reconstructor.create_state();
    reconstructor.reconstruct(event.header, &event.hits, &mut state, sink)
}

/// Reconstructs independent events in parallel.
///
/// Results keep the input order. When `monitor` is set, every event fills
/// its own collector and the collectors are merged in input order, so the
/// histograms equal those of a serial run.
pub fn reconstruct_events(
    events: &[Event],
    config: &TrackingConfig,
    monitor: bool,
) -> RunReconstruction {
    let reconstructor = TrackReconstructor::new(*config);

    let per_event: Vec<(EventReconstruction, Option<HistogramCollector>)> = events
        .par_iter()
        .map_init(
            || reconstructor.create_state(),
            |state, event| {
                if monitor {
                    let mut collector = HistogramCollector::new();
                    let result =
                        reconstructor.reconstruct(event.header, &event.hits, state, &mut collector);
                    (result, Some(collector))
                } else {
                    let result =
                        reconstructor.reconstruct(event.header, &event.hits, state, &mut NullSink);
                    (result, None)
                }
            },
        )
        .collect();

    let mut run = RunReconstruction::default();
    run.events.reserve(per_event.len());
    for (result, collector) in per_event {
        run.statistics.merge(&result.statistics);
        if let Some(collector) = collector {
            run.histograms.merge(&collector);
        }
        run.events.push(result);
    }
    run
}
