// src/line_reader.rs - Lines from plain or gzip-compressed log files

use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ReadError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BUFFER_SIZE: usize = 65536; // 64KB

pub struct LineReader;

impl LineReader {
    /// Open `path` and return its lines from the beginning.
    ///
    /// Gzip framing is detected from the magic bytes, not the extension, so
    /// rotated logs such as `hostd.0.gz` and misnamed files both work.
    pub fn open(path: &Path) -> Result<Lines, ReadError> {
        let unreadable = |source| ReadError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        let compressed = reader.fill_buf().map_err(unreadable)?.starts_with(&GZIP_MAGIC);

        let reader: Box<dyn BufRead + Send> = if compressed {
            Box::new(BufReader::with_capacity(
                BUFFER_SIZE,
                MultiGzDecoder::new(reader),
            ))
        } else {
            Box::new(reader)
        };

        Ok(Lines {
            path: path.to_path_buf(),
            reader,
            buf: Vec::new(),
            compressed,
            done: false,
        })
    }
}

/// Lazy, finite sequence of decoded lines.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected. An I/O
/// error (including corrupt gzip data) is yielded once and ends the sequence.
pub struct Lines {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    compressed: bool,
    done: bool,
}

impl Lines {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
}

impl Iterator for Lines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
