//! Hit file reader.
//!
//! Hit files are plain text with one hit per line:
//!
//! ```text
//! # run event plane x y z [layer]
//! 12 1 0 0.125 -1.50 0.0
//! 12 1 1 0.131 -1.48 150.0
//! ```
//!
//! Blank lines and `#` comments are skipped. Consecutive lines with the same
//! run and event numbers form one event. The layer label defaults to the
//! plane id.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use teltrack_core::hit::{Event, EventHeader, Hit};

/// Parses one non-comment line into its header and hit.
fn parse_line(text: &str, line: usize) -> Result<(EventHeader, Hit)> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 && fields.len() != 7 {
        return Err(Error::Parse {
            line,
            message: format!("expected 6 or 7 fields, found {}", fields.len()),
        });
    }

    let parse_err = |name: &str, value: &str| Error::Parse {
        line,
        message: format!("invalid {name}: {value:?}"),
    };
    let run: u32 = fields[0].parse().map_err(|_| parse_err("run", fields[0]))?;
    let event: u64 = fields[1].parse().map_err(|_| parse_err("event", fields[1]))?;
    let plane: u32 = fields[2].parse().map_err(|_| parse_err("plane", fields[2]))?;
    let mut coords = [0.0f64; 3];
    for (slot, (name, value)) in coords
        .iter_mut()
        .zip(["x", "y", "z"].into_iter().zip(&fields[3..6]))
    {
        *slot = value.parse().map_err(|_| parse_err(name, *value))?;
    }

    let mut hit = Hit::new(plane, coords[0], coords[1], coords[2]);
    if let Some(layer) = fields.get(6) {
        hit.layer = layer.parse().map_err(|_| parse_err("layer", *layer))?;
    }
    Ok((EventHeader::new(run, event), hit))
}

/// Streaming reader yielding one [`Event`] at a time.
pub struct HitReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_number: usize,
    pending: Option<(EventHeader, Hit)>,
    finished: bool,
}

impl<R: BufRead> HitReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            pending: None,
            finished: false,
        }
    }

    /// Next parsed hit line, skipping blanks and comments.
    fn next_hit(&mut self) -> Result<Option<(EventHeader, Hit)>> {
        for text in self.lines.by_ref() {
            self.line_number += 1;
            let text = text?;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return parse_line(trimmed, self.line_number).map(Some);
        }
        Ok(None)
    }

    fn read_event(&mut self) -> Result<Option<Event>> {
        let first = match self.pending.take() {
            Some(entry) => entry,
            None => match self.next_hit()? {
                Some(entry) => entry,
                None => return Ok(None),
            },
        };

        let (header, hit) = first;
        let mut event = Event::new(header, vec![hit]);
        while let Some((next_header, next_hit)) = self.next_hit()? {
            if next_header != header {
                self.pending = Some((next_header, next_hit));
                break;
            }
            event.hits.push(next_hit);
        }
        Ok(Some(event))
    }
}

impl<R: BufRead> Iterator for HitReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Reader for hit files on disk.
pub struct HitFileReader {
    reader: HitReader<BufReader<File>>,
}

impl HitFileReader {
    /// Opens a hit file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: HitReader::new(BufReader::new(file)),
        })
    }

    /// Streams the events of the file.
    pub fn events(self) -> HitReader<BufReader<File>> {
        self.reader
    }

    /// Reads every event of the file.
    ///
    /// # Errors
    /// Returns the first read or parse error.
    pub fn read_all(self) -> Result<Vec<Event>> {
        self.reader.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str) -> Result<Vec<Event>> {
        HitReader::new(Cursor::new(text)).collect()
    }

    #[test]
    fn test_groups_consecutive_lines() {
        let text = "\
# run event plane x y z
5 1 0 0.0 0.0 0.0
5 1 1 0.1 0.0 150.0

5 2 0 1.0 2.0 0.0
5 2 6 1.0 2.0 900.0 21
";
        let events = read(text).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].header, EventHeader::new(5, 1));
        assert_eq!(events[0].hits.len(), 2);
        assert_eq!(events[1].header.event, 2);
        assert_eq!(events[1].hits[1].plane, 6);
        assert_eq!(events[1].hits[1].layer, 21);
        assert_eq!(events[1].hits[0].layer, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(read("").unwrap().is_empty());
        assert!(read("# only a comment\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors_carry_line_number() {
        let err = read("1 1 0 0.0 0.0 0.0\n1 1 1 abc 0.0 150.0\n").unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("x"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = read("1 1 0 0.0\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_stops_after_error() {
        let mut reader = HitReader::new(Cursor::new("bad line\n1 1 0 0 0 0\n"));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
