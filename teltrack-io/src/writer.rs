//! Segment and monitoring output.

use crate::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use teltrack_algorithms::EventReconstruction;
use teltrack_core::histogram::HistogramCollector;
use teltrack_core::hit::{Hit, Point3, Xy};
use teltrack_core::track::Segment;

/// Writer for the "hits on segments" text dump.
///
/// Each segment is written as a header line `<event> <beam energy>`
/// followed by one `<layer> <x> <y> <z>` line per hit: the six telescope
/// hits, then any attached DUT hits. A block ends at the next header.
pub struct SegmentDumpWriter<W: Write> {
    writer: W,
    beam_energy: f64,
    segments_written: usize,
}

impl SegmentDumpWriter<BufWriter<File>> {
    /// Creates a dump file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, beam_energy: f64) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), beam_energy))
    }
}

impl<W: Write> SegmentDumpWriter<W> {
    /// Wraps an output stream.
    pub fn new(writer: W, beam_energy: f64) -> Self {
        Self {
            writer,
            beam_energy,
            segments_written: 0,
        }
    }

    /// Writes one segment block.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_segment(&mut self, event: u64, segment: &Segment) -> Result<()> {
        writeln!(self.writer, "{} {}", event, self.beam_energy)?;
        for hit in segment.all_hits() {
            writeln!(
                self.writer,
                "{} {} {} {}",
                hit.layer,
                hit.x(),
                hit.y(),
                hit.z()
            )?;
        }
        self.segments_written += 1;
        Ok(())
    }

    /// Writes every segment of a reconstructed event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_event(&mut self, result: &EventReconstruction) -> Result<()> {
        for segment in &result.segments {
            self.write_segment(result.header.event, segment)?;
        }
        Ok(())
    }

    /// Number of segment blocks written so far.
    pub fn segments_written(&self) -> usize {
        self.segments_written
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying stream.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Flat JSON record of one segment.
#[derive(Debug, Serialize)]
struct SegmentRecord<'a> {
    run: u32,
    event: u64,
    position: Point3,
    slope: Xy,
    curvature: Xy,
    hits: &'a [Hit],
    dut_hits: &'a [Hit],
}

/// Writes all segments of the given events as a JSON array.
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn write_segments_json<W: Write>(writer: W, events: &[EventReconstruction]) -> Result<()> {
    let records: Vec<SegmentRecord<'_>> = events
        .iter()
        .flat_map(|result| {
            result.segments.iter().map(move |segment| SegmentRecord {
                run: result.header.run,
                event: result.header.event,
                position: segment.position,
                slope: segment.slope,
                curvature: segment.curvature,
                hits: &segment.hits,
                dut_hits: &segment.dut_hits,
            })
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Monitoring summary of one histogram, as written to JSON.
#[derive(Debug, Serialize)]
struct HistogramRecord<'a> {
    name: &'a str,
    entries: u64,
    mean: Option<f64>,
    rms: Option<f64>,
    min: f64,
    max: f64,
}

/// Writes the histogram summaries as a JSON array ordered by name.
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn write_histograms_json<W: Write>(writer: W, histograms: &HistogramCollector) -> Result<()> {
    let records: Vec<HistogramRecord<'_>> = histograms
        .iter()
        .map(|(name, summary)| HistogramRecord {
            name,
            entries: summary.entries,
            mean: summary.mean(),
            rms: summary.rms(),
            min: summary.min,
            max: summary.max,
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use teltrack_algorithms::ReconstructionStatistics;
    use teltrack_core::hit::EventHeader;
    use teltrack_core::HistogramSink;
    use tempfile::NamedTempFile;

    fn segment() -> Segment {
        let hits = [0u32, 1, 2, 3, 4, 5].map(|plane| {
            let z = 150.0 * f64::from(plane);
            Hit::new(plane, 0.5, -0.25, z).with_layer(plane + 10)
        });
        Segment {
            hits,
            triplets: [0, 0],
            position: Point3::new(0.5, -0.25, 375.0),
            slope: Xy::ZERO,
            curvature: Xy::ZERO,
            dut_hits: vec![Hit::new(6, 0.5, -0.25, 900.0)],
            match_count: 0,
        }
    }

    #[test]
    fn test_dump_format() {
        let result = EventReconstruction {
            header: EventHeader::new(3, 42),
            segments: vec![segment(), segment()],
            statistics: ReconstructionStatistics::default(),
        };
        let mut writer = SegmentDumpWriter::new(Vec::new(), 120.0);
        writer.write_event(&result).unwrap();
        assert_eq!(writer.segments_written(), 2);

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 16);
        assert_eq!(lines[0], "42 120");
        assert_eq!(lines[1], "10 0.5 -0.25 0");
        assert_eq!(lines[6], "15 0.5 -0.25 750");
        assert_eq!(lines[7], "6 0.5 -0.25 900");
        assert_eq!(lines[8], "42 120");
    }

    #[test]
    fn test_dump_file() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = SegmentDumpWriter::create(file.path(), 5.6).unwrap();
        writer.write_segment(7, &segment()).unwrap();
        writer.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("7 5.6\n"));
    }

    #[test]
    fn test_segments_json() {
        let result = EventReconstruction {
            header: EventHeader::new(3, 42),
            segments: vec![segment()],
            statistics: ReconstructionStatistics::default(),
        };
        let mut buffer = Vec::new();
        write_segments_json(&mut buffer, &[result]).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["event"], 42);
        assert_eq!(records[0]["hits"].as_array().unwrap().len(), 6);
        assert_eq!(records[0]["dut_hits"][0]["plane"], 6);
    }

    #[test]
    fn test_histograms_json() {
        let mut histograms = HistogramCollector::new();
        histograms.add_entry("b", 1.0);
        histograms.add_entry("a", 2.0);
        histograms.add_entry("a", 4.0);

        let mut buffer = Vec::new();
        write_histograms_json(&mut buffer, &histograms).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value[0]["name"], "a");
        assert_eq!(value[0]["entries"], 2);
        assert_eq!(value[0]["mean"], 3.0);
        assert_eq!(value[1]["name"], "b");
    }
}
