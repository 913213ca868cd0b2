//! JSON configuration files.
//!
//! ```json
//! {
//!   "cuts": [[2.0, 2.0], [0.1, 0.1], [0.005, 0.005], [0.2, 0.2], [0.3, 0.3]],
//!   "run": { "qbyp": -0.2, "bfac": { "x": 0.0, "y": 0.0 }, "z_mag": 0.0, "beam_energy": 5.6 }
//! }
//! ```
//!
//! `cuts` lists the doublet, triplet, slope and position windows, plus an
//! optional DUT window. `run` may be omitted.

use crate::Result;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use teltrack_core::config::TrackingConfig;

/// Reads a configuration from a JSON stream.
///
/// # Errors
/// Returns an error if the JSON is malformed, the cuts are invalid, or a run
/// parameter is not finite.
pub fn read_config<R: Read>(reader: R) -> Result<TrackingConfig> {
    let config: TrackingConfig = serde_json::from_reader(reader)?;
    config.run.validate()?;
    debug!(
        "loaded cuts {:?}, DUT matching {}",
        config.cuts.to_pairs(),
        if config.cuts.dut.is_some() { "on" } else { "off" }
    );
    Ok(config)
}

/// Loads a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be opened or its content is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackingConfig> {
    let file = File::open(path)?;
    read_config(BufReader::new(file))
}
