//! teltrack-algorithms: Track finding for beam telescopes.
//!
//! This crate provides the per-event reconstruction stages:
//! - **Triplets** - doublet + middle hit search in each three-plane arm
//! - **Segments** - unique pairing of upstream and downstream triplets,
//!   with a one-step curvature refinement when a field is configured
//! - **DUT matching** - unique association of extra hits to segments
//!
//! plus helpers that run the full pipeline on one event or, in parallel, on
//! many independent events.
//!
#![warn(missing_docs)]

pub mod doublet;
mod dut;
mod processing;
mod segment;
mod triplet;

pub use doublet::{build_doublet, match_middle_hit, middle_hit_residual, sagitta_correct};
pub use dut::DutMatcher;
pub use processing::{
    reconstruct_event, reconstruct_events, EventReconstruction, ReconstructionState,
    RunReconstruction, TrackReconstructor,
};
pub use segment::{curvature_step, CandidatePair, PairMatch, SegmentCombiner};
pub use triplet::{TripletFinder, TripletStore};

// Re-export core types
pub use teltrack_core::{
    Arm, Cuts, Event, EventHeader, HistogramCollector, HistogramSink, Hit, NullSink,
    ReconstructionStatistics, RunParameters, Segment, TrackingConfig, Triplet, Xy,
};
