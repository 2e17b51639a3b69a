//! Sequential access unit import from a single track.

use std::io::{Read, Seek};

use log::{Level, LevelFilter};

use crate::engine::{FileMode, MediaEngine};
use crate::media::{Sample, Summary, SummaryParams};
use crate::mp4_engine::Mp4Engine;
use crate::timebase;
use crate::{Error, Result};

/// Name this importer identifies itself with.
pub const IMPORTER_NAME: &str = "ISOBMFF/QTFF";

/// Number of tracks one importer instance services.
pub const TRACK_COUNT: u32 = 1;

macro_rules! importer_log {
    ($config:expr, $level:expr, $($arg:tt)+) => {
        if $level <= $config.log_level {
            log::log!($level, $($arg)+);
        }
    };
}

/// Configuration options for the importer.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Most verbose level this importer emits log records at.
    pub log_level: LevelFilter,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Warn,
        }
    }
}

/// Importer status after the most recent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// The last delivered sample switched to a new description.
    Change,
    /// Every sample has been delivered. Terminal.
    Eof,
    /// The timeline became inconsistent. Terminal.
    Error,
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessUnit {
    /// The next sample, under the active description.
    Ok(Sample),
    /// The next sample, which introduced a new description. The new summary
    /// is registered before this is returned.
    Change(Sample),
    /// No more samples.
    Eof,
}

impl AccessUnit {
    pub fn status(&self) -> Status {
        match self {
            AccessUnit::Ok(_) => Status::Ok,
            AccessUnit::Change(_) => Status::Change,
            AccessUnit::Eof => Status::Eof,
        }
    }

    pub fn sample(&self) -> Option<&Sample> {
        match self {
            AccessUnit::Ok(sample) | AccessUnit::Change(sample) => Some(sample),
            AccessUnit::Eof => None,
        }
    }

    pub fn into_sample(self) -> Option<Sample> {
        match self {
            AccessUnit::Ok(sample) | AccessUnit::Change(sample) => Some(sample),
            AccessUnit::Eof => None,
        }
    }
}

struct ImporterState<E> {
    engine: E,
    track_id: u32,
    timebase: u64,
    description_index: u32,
    au_number: u32,
}

impl<E: MediaEngine> ImporterState<E> {
    /// Takes ownership of `engine`; on any failure the engine and everything
    /// fetched from it are dropped before returning.
    fn probe(mut engine: E) -> Result<(Self, Summary)> {
        let modes = engine.read_file()?;
        if !modes.intersects(FileMode::RECOGNIZED) {
            return Err(Error::InvalidFormat);
        }
        let track_id = engine.track_id(1).ok_or(Error::Unsupported)?;
        engine.construct_timeline(track_id)?;

        let mut state = Self {
            engine,
            track_id,
            timebase: 1,
            description_index: 1,
            au_number: 0,
        };
        let mut summary = state.engine.summary(track_id, 1).ok_or(Error::Nameless)?;
        if summary.is_video() {
            let mut timestamps = state.engine.media_timestamps(track_id)?;
            let last_sample_delta = state.engine.last_sample_delta(track_id)?;
            state.timebase = timebase::derive(last_sample_delta, &mut timestamps);
        }
        state.decorate(&mut summary);
        Ok((state, summary))
    }

    /// Fills in what the caller needs beyond the engine's own description.
    fn decorate(&self, summary: &mut Summary) {
        summary.max_au_length = self.engine.max_sample_size(self.track_id);
        if let SummaryParams::Video(video) = &mut summary.params {
            video.timebase = self.timebase;
            video.timescale = self.engine.media_timescale(self.track_id);
        }
    }
}

/// Pulls access units from the first track of an ISOBMFF/QTFF file.
///
/// The importer owns its engine for its whole lifetime; dropping it (or
/// calling [`cleanup`](Importer::cleanup)) releases all engine state.
pub struct Importer<E> {
    config: ImporterConfig,
    state: Option<ImporterState<E>>,
    status: Status,
    summary: Option<Summary>,
}

impl<E: MediaEngine> Importer<E> {
    pub fn new(config: ImporterConfig) -> Self {
        Self {
            config,
            state: None,
            status: Status::Ok,
            summary: None,
        }
    }

    pub fn name(&self) -> &'static str {
        IMPORTER_NAME
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of access units delivered so far.
    pub fn au_number(&self) -> u32 {
        self.state.as_ref().map_or(0, |state| state.au_number)
    }

    /// Timestamp scale factor; 1 until a video track has been probed.
    pub fn timebase(&self) -> u64 {
        self.state.as_ref().map_or(1, |state| state.timebase)
    }

    /// The description of the most recently delivered sample.
    pub fn summary(&self, track_number: u32) -> Option<&Summary> {
        if track_number != TRACK_COUNT {
            return None;
        }
        self.summary.as_ref()
    }

    /// Opens the file behind `engine`, selects its first track and derives
    /// the timebase.
    ///
    /// Probing an already probed importer tears the previous state down
    /// first. On failure the importer is left unprobed.
    pub fn probe(&mut self, engine: E) -> Result<()> {
        self.cleanup();
        let (state, summary) = ImporterState::probe(engine).map_err(|err| {
            importer_log!(self.config, Level::Debug, "{}: probe failed: {}", IMPORTER_NAME, err);
            err
        })?;
        importer_log!(
            self.config,
            Level::Info,
            "{}: track {} selected, {} summary, timebase {}",
            IMPORTER_NAME,
            state.track_id,
            summary.sample_type,
            state.timebase
        );
        self.state = Some(state);
        self.summary = Some(summary);
        self.status = Status::Ok;
        Ok(())
    }

    /// Fetches the next access unit in decode order.
    ///
    /// Timestamps are divided by the timebase. After [`AccessUnit::Eof`]
    /// every further call returns `Eof` again without reading anything.
    pub fn get_access_unit(&mut self, track_number: u32) -> Result<AccessUnit> {
        let Some(state) = self.state.as_mut() else {
            return Err(Error::Nameless);
        };
        match self.status {
            Status::Error => return Err(Error::Nameless),
            Status::Eof => return Ok(AccessUnit::Eof),
            Status::Ok | Status::Change => {}
        }
        if track_number != TRACK_COUNT {
            return Err(Error::ParamError);
        }
        if state.engine.track_id(track_number) != Some(state.track_id) {
            return Err(Error::Unsupported);
        }

        let sample_number = state.au_number + 1;
        let Some(mut sample) = state.engine.sample(state.track_id, sample_number) else {
            if state.engine.sample_exists(state.track_id, sample_number) {
                importer_log!(
                    self.config,
                    Level::Warn,
                    "{}: sample {} exists but could not be read",
                    IMPORTER_NAME,
                    sample_number
                );
                self.status = Status::Error;
                return Err(Error::Nameless);
            }
            importer_log!(
                self.config,
                Level::Debug,
                "{}: end of stream after {} access units",
                IMPORTER_NAME,
                state.au_number
            );
            self.status = Status::Eof;
            return Ok(AccessUnit::Eof);
        };
        sample.dts /= state.timebase;
        sample.cts /= state.timebase;

        let changed = sample.index != state.description_index;
        if changed {
            let Some(mut summary) = state.engine.summary(state.track_id, sample.index) else {
                importer_log!(
                    self.config,
                    Level::Warn,
                    "{}: description {} of sample {} not found",
                    IMPORTER_NAME,
                    sample.index,
                    sample_number
                );
                return Err(Error::Nameless);
            };
            state.decorate(&mut summary);
            importer_log!(
                self.config,
                Level::Debug,
                "{}: description changed from {} to {} at sample {}",
                IMPORTER_NAME,
                state.description_index,
                sample.index,
                sample_number
            );
            self.summary = Some(summary);
            state.description_index = sample.index;
        }

        state.au_number += 1;
        importer_log!(
            self.config,
            Level::Trace,
            "{}: access unit {} dts {} cts {} size {}",
            IMPORTER_NAME,
            state.au_number,
            sample.dts,
            sample.cts,
            sample.data.len()
        );
        if changed {
            self.status = Status::Change;
            Ok(AccessUnit::Change(sample))
        } else {
            self.status = Status::Ok;
            Ok(AccessUnit::Ok(sample))
        }
    }

    /// Duration of the final sample in timebase units.
    ///
    /// Advisory only: returns 0 instead of failing when the importer is not
    /// probed, the track number is wrong or the engine cannot tell.
    pub fn get_last_delta(&self, track_number: u32) -> u32 {
        let Some(state) = self.state.as_ref() else {
            return 0;
        };
        if track_number != TRACK_COUNT {
            return 0;
        }
        match state.engine.last_sample_delta(state.track_id) {
            Ok(delta) => (delta as u64 / state.timebase) as u32,
            Err(err) => {
                importer_log!(
                    self.config,
                    Level::Debug,
                    "{}: last sample delta unavailable: {}",
                    IMPORTER_NAME,
                    err
                );
                0
            }
        }
    }

    /// Releases the engine and the registered summary. Safe to call more than
    /// once, and on an importer that was never probed.
    pub fn cleanup(&mut self) {
        if self.state.take().is_some() {
            importer_log!(self.config, Level::Debug, "{}: released engine state", IMPORTER_NAME);
        }
        self.summary = None;
    }
}

impl<'a, R: Read + Seek> Importer<Mp4Engine<'a, R>> {
    /// Probes a caller-owned byte source. The source is borrowed, never
    /// closed, and usable again once the importer is dropped.
    pub fn probe_reader(&mut self, source: &'a mut R) -> Result<()> {
        self.probe(Mp4Engine::attach(source))
    }
}

impl<E: MediaEngine> Default for Importer<E> {
    fn default() -> Self {
        Self::new(ImporterConfig::default())
    }
}
