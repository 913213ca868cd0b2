//! teltrack-core: Core types for beam telescope track finding.
//!
//! This crate provides the hit and track candidate data model, the cut and
//! run configuration, the monitoring sink and the reconstruction counters.
//!

pub mod config;
pub mod error;
pub mod histogram;
pub mod hit;
pub mod statistics;
pub mod track;

pub use config::{Cuts, RunParameters, TrackingConfig};
pub use error::{Error, Result};
pub use histogram::{HistogramCollector, HistogramSink, HistogramSummary, NullSink};
pub use hit::{Event, EventHeader, Hit, HitGroup, Point3, Xy, FIRST_DUT_PLANE, TELESCOPE_PLANES};
pub use statistics::ReconstructionStatistics;
pub use track::{Arm, Doublet, Segment, Triplet};
