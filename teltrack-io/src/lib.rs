//! teltrack-io: File I/O for teltrack.
//!
//! This crate reads plain-text hit files into events, loads JSON
//! configurations and writes reconstructed segments, either as the
//! "hits on segments" text dump or as JSON.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{load_config, read_config};
pub use error::{Error, Result};
pub use reader::{HitFileReader, HitReader};
pub use writer::{write_histograms_json, write_segments_json, SegmentDumpWriter};
