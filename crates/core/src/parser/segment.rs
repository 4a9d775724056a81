//! Splitting multi-game PGN files into one text record per game

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const RECORD_START: &str = "[Event ";

/// Streams game records out of a PGN source.
///
/// A record starts at every line beginning with `[Event `. Blank lines do
/// not split records because comments may contain them. Only the current
/// record is held in memory. Bytes that are not UTF-8 are replaced rather
/// than failing the whole file.
pub struct PgnSegments<R> {
    reader: R,
    buffer: String,
    line: Vec<u8>,
    done: bool,
}

impl<R: BufRead> PgnSegments<R> {
    pub fn new(reader: R) -> Self {
        PgnSegments {
            reader,
            buffer: String::new(),
            line: Vec::new(),
            done: false,
        }
    }

    fn take_record(&mut self) -> Option<String> {
        let record = self.buffer.trim().to_string();
        self.buffer.clear();
        if record.is_empty() {
            None
        } else {
            Some(record)
        }
    }
}

impl PgnSegments<BufReader<File>> {
    /// Opens `path` for segmenting
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(PgnSegments::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for PgnSegments<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return self.take_record().map(Ok);
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    if line.trim_start().starts_with(RECORD_START) {
                        let finished = self.take_record();
                        self.buffer.push_str(&line);
                        if let Some(record) = finished {
                            return Some(Ok(record));
                        }
                    } else {
                        self.buffer.push_str(&line);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
