//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{MetaError, Result};

use super::entry::parse_header;
use super::{WalEntry, HEADER_SIZE};

/// Outcome of reading one frame from the log
pub(super) enum Frame {
    /// A complete, CRC-valid entry
    Entry(WalEntry),
    /// Clean end of file
    End,
    /// The file ends inside a header or body
    PartialTail,
    /// A complete frame failed validation
    Corrupt(String),
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last valid entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file and at a torn tail; a complete
    /// entry with a bad checksum is an error.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End | Frame::PartialTail => Ok(None),
            Frame::Corrupt(reason) => Err(MetaError::WalCorruption(reason)),
        }
    }

    /// Offset just past the last valid entry read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(Frame::End),
            n if n < HEADER_SIZE => return Ok(Frame::PartialTail),
            _ => {}
        }

        let (_, _, len) = parse_header(&header);
        let mut frame = vec![0u8; HEADER_SIZE + len];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        if read_full(&mut self.reader, &mut frame[HEADER_SIZE..])? < len {
            return Ok(Frame::PartialTail);
        }

        match WalEntry::deserialize(&frame) {
            Ok(entry) => {
                self.position += frame.len() as u64;
                Ok(Frame::Entry(entry))
            }
            Err(MetaError::WalCorruption(reason)) => Ok(Frame::Corrupt(reason)),
            Err(e) => Err(e),
        }
    }
}

/// Fill `buf` as far as the file allows, returning the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
