//! The container engine contract the importer drives.
//!
//! An engine owns everything parsed out of the byte source: the box tree,
//! per-track timelines and sample descriptions. The importer only queries it.
//! Releasing engine objects is ordinary `Drop`.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::ops::BitOr;

use crate::media::{Sample, Summary};

#[cfg(test)]
pub(crate) mod fake;

/// Structural layouts the engine recognized while reading a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMode(u32);

impl FileMode {
    /// Box structured file (`ftyp` or a bare QuickTime `moov`).
    pub const BOX: FileMode = FileMode(1 << 0);
    /// Movie fragments are present.
    pub const FRAGMENTED: FileMode = FileMode(1 << 1);
    /// Carries the movie header needed to initialise decoding.
    pub const INITIALIZATION: FileMode = FileMode(1 << 2);
    /// Carries media data.
    pub const MEDIA: FileMode = FileMode(1 << 3);
    /// Carries a segment index.
    pub const INDEX: FileMode = FileMode(1 << 4);
    /// Is a media segment (`styp`).
    pub const SEGMENT: FileMode = FileMode(1 << 5);

    /// Every mode the importer accepts.
    pub const RECOGNIZED: FileMode = FileMode(0x3f);

    pub const fn empty() -> Self {
        FileMode(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: FileMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: FileMode) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: FileMode) {
        self.0 |= other.0;
    }
}

impl BitOr for FileMode {
    type Output = FileMode;

    fn bitor(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 | rhs.0)
    }
}

/// Decode and composition time of one sample, in media timescale units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTimestamp {
    pub dts: u64,
    pub cts: u64,
}

/// Timestamps of every sample of a track, initially in decode order.
#[derive(Debug, Clone, Default)]
pub struct TimestampList {
    timestamps: Vec<MediaTimestamp>,
}

impl TimestampList {
    pub fn new(timestamps: Vec<MediaTimestamp>) -> Self {
        Self { timestamps }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn as_slice(&self) -> &[MediaTimestamp] {
        &self.timestamps
    }

    /// Reorders the list by composition time. Ties keep decode order.
    pub fn sort_composition_order(&mut self) {
        self.timestamps.sort_by_key(|ts| ts.cts);
    }
}

/// Errors reported by a container engine.
#[derive(Debug)]
pub enum EngineError {
    /// Reading the byte source failed.
    Io(io::Error),

    /// The box parser rejected the file.
    Parse(mp4::Error),

    /// The file parsed but its tables are inconsistent.
    InvalidData(String),

    /// An allocation for engine tables failed.
    MemoryExhausted,

    /// No track with the given identifier.
    TrackNotFound(u32),

    /// The timeline of the given track was never constructed.
    NoTimeline(u32),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io(err) => write!(f, "I/O error: {}", err),
            EngineError::Parse(err) => write!(f, "MP4 parsing error: {}", err),
            EngineError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            EngineError::MemoryExhausted => write!(f, "Memory exhausted"),
            EngineError::TrackNotFound(track_id) => write!(f, "Track {} not found", track_id),
            EngineError::NoTimeline(track_id) => {
                write!(f, "Timeline for track {} not constructed", track_id)
            }
        }
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EngineError::Io(err) => Some(err),
            EngineError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<mp4::Error> for EngineError {
    fn from(err: mp4::Error) -> Self {
        EngineError::Parse(err)
    }
}

impl From<std::collections::TryReserveError> for EngineError {
    fn from(_: std::collections::TryReserveError) -> Self {
        EngineError::MemoryExhausted
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Operations the importer needs from a media container engine.
///
/// Sample numbers and description indices are 1-based, as in the container
/// tables. Track positions are 1-based ordinals in file order.
pub trait MediaEngine {
    /// Parses the attached byte source and reports its structural modes.
    ///
    /// A source that exhibits no recognized mode is not an error here; the
    /// engine returns an empty [`FileMode`] and the caller decides.
    fn read_file(&mut self) -> EngineResult<FileMode>;

    /// Track identifier at the given position, if there is one.
    fn track_id(&self, position: u32) -> Option<u32>;

    /// Builds the media timeline of a track.
    fn construct_timeline(&mut self, track_id: u32) -> EngineResult<()>;

    /// Fetches a sample by its decode-order number.
    fn sample(&mut self, track_id: u32, sample_number: u32) -> Option<Sample>;

    /// Whether the timeline has a sample at that number, without reading it.
    fn sample_exists(&self, track_id: u32, sample_number: u32) -> bool;

    /// Builds the summary of a sample description.
    fn summary(&self, track_id: u32, description_index: u32) -> Option<Summary>;

    /// Largest sample size of the track in bytes; 0 if unknown.
    fn max_sample_size(&self, track_id: u32) -> u32;

    /// Native media timescale of the track; 0 if unknown.
    fn media_timescale(&self, track_id: u32) -> u32;

    /// Duration of the final sample of the track.
    fn last_sample_delta(&self, track_id: u32) -> EngineResult<u32>;

    /// Timestamps of every sample of the track in decode order.
    fn media_timestamps(&self, track_id: u32) -> EngineResult<TimestampList>;
}
