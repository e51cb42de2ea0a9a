//! Memory-mapped file layer (spec.md §6): locates session boundaries in a
//! blackbox log file and exposes each session as an independently
//! decodable byte region. A single file may hold several recordings
//! back to back, each reopening with its own `LOG_START_MARKER` line.
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::core::{LOG_START_MARKER, MAX_SESSIONS};
use crate::error::{DecodeError, SessionError};
use crate::protocol::decoder;
use crate::protocol::header::LogHeader;
use crate::protocol::stats::Stats;
use crate::sink::FrameSink;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(bytes) => &bytes[..],
        }
    }
}

/// An opened blackbox log file, split into its constituent sessions.
pub struct LogFile {
    backing: Backing,
    session_offsets: Vec<usize>,
}

impl LogFile {
    /// Map `path` into memory and enumerate its sessions.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        if mmap.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let session_offsets = enumerate_sessions(&mmap);
        Ok(Self {
            backing: Backing::Mapped(mmap),
            session_offsets,
        })
    }

    /// Wrap an in-memory buffer as if it were a mapped file, useful for
    /// tests and for input that did not arrive via the filesystem.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, SessionError> {
        if data.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let session_offsets = enumerate_sessions(&data);
        Ok(Self {
            backing: Backing::Owned(data),
            session_offsets,
        })
    }

    pub fn session_count(&self) -> usize {
        self.session_offsets.len()
    }

    /// Borrow the `index`th session's byte region.
    pub fn session(&self, index: usize) -> Result<Session<'_>, SessionError> {
        let count = self.session_count();
        let start = *self
            .session_offsets
            .get(index)
            .ok_or(SessionError::IndexOutOfRange { index, count })?;
        let end = self
            .session_offsets
            .get(index + 1)
            .copied()
            .unwrap_or_else(|| self.backing.as_slice().len());
        Ok(Session {
            data: &self.backing.as_slice()[start..end],
        })
    }

    /// Iterate over every session in file order.
    pub fn sessions(&self) -> impl Iterator<Item = Session<'_>> {
        (0..self.session_count()).map(move |i| self.session(i).expect("index within bounds"))
    }
}

/// One session's worth of bytes: an ASCII header block followed by its
/// binary frame stream, ready to decode independently of any other
/// session in the same file.
#[derive(Debug)]
pub struct Session<'a> {
    data: &'a [u8],
}

impl<'a> Session<'a> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode this session, delivering callbacks to `sink`. `raw` disables
    /// prediction (spec.md §4.3), returning residuals as-is.
    pub fn parse(&self, raw: bool, sink: &mut dyn FrameSink) -> Result<(LogHeader, Stats), DecodeError> {
        decoder::parse(self.data, raw, sink)
    }
}

/// Find up to `MAX_SESSIONS` occurrences of `LOG_START_MARKER`, each
/// becoming a session's start offset. A file with no marker at all is
/// treated as a single unlabeled session starting at byte zero, matching
/// the decoder's general tolerance for irregular input.
fn enumerate_sessions(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 0;
    while offsets.len() < MAX_SESSIONS && pos + LOG_START_MARKER.len() <= data.len() {
        match find_subslice(&data[pos..], LOG_START_MARKER) {
            Some(found) => {
                let start = pos + found;
                offsets.push(start);
                pos = start + LOG_START_MARKER.len();
            }
            None => break,
        }
    }
    if offsets.is_empty() {
        offsets.push(0);
    }
    offsets
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    fn session_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(LOG_START_MARKER);
        data.extend_from_slice(b"H Field I name:loopIteration\n");
        data.extend_from_slice(b"H Field I signed:0\n");
        data.extend_from_slice(b"H Field I predictor:0\n");
        data.extend_from_slice(b"H Field I encoding:1\n");
        data.push(b'I');
        data.push(5);
        data
    }

    #[test]
    fn two_concatenated_sessions_enumerate_independently() {
        let mut data = session_bytes();
        data.extend(session_bytes());
        let file = LogFile::from_bytes(data).unwrap();
        assert_eq!(file.session_count(), 2);

        let mut sink = NullSink;
        let (header, stats) = file.session(0).unwrap().parse(false, &mut sink).unwrap();
        assert_eq!(header.main.field_count(), 1);
        assert_eq!(stats.for_kind(crate::core::FrameKind::Intra).valid, 1);
    }

    #[test]
    fn out_of_range_session_index_is_reported() {
        let file = LogFile::from_bytes(session_bytes()).unwrap();
        let err = file.session(5).unwrap_err();
        assert!(matches!(err, SessionError::IndexOutOfRange { index: 5, count: 1 }));
    }

    #[test]
    fn file_without_any_marker_is_one_session() {
        let file = LogFile::from_bytes(b"I\x05".to_vec()).unwrap();
        assert_eq!(file.session_count(), 1);
    }
}
