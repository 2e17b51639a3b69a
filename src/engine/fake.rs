//! In-memory engine for exercising the importer without container data.

use std::cell::Cell;
use std::rc::Rc;

use bytes::Bytes;

use super::{EngineError, EngineResult, FileMode, MediaEngine, MediaTimestamp, TimestampList};
use crate::media::{Sample, Summary};

#[derive(Debug, Clone)]
pub(crate) struct FakeSample {
    pub dts: u64,
    pub cts: u64,
    pub duration: u32,
    pub index: u32,
    pub size: u32,
}

/// Scripted engine. `live` counts engines not yet dropped, `calls` counts
/// every trait method invocation.
#[derive(Debug)]
pub(crate) struct FakeEngine {
    pub modes: FileMode,
    pub track_ids: Vec<u32>,
    pub samples: Vec<FakeSample>,
    pub summaries: Vec<Summary>,
    pub timescale: u32,
    pub fail_timeline: bool,
    /// Sample numbers that report existence but fail to load.
    pub unreadable: Vec<u32>,
    /// Description indices whose lookup fails after probing.
    pub missing_summaries: Vec<u32>,
    pub timeline_built: bool,
    pub calls: Rc<Cell<usize>>,
    pub live: Rc<Cell<usize>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let live = Rc::new(Cell::new(1));
        Self {
            modes: FileMode::BOX | FileMode::INITIALIZATION | FileMode::MEDIA,
            track_ids: vec![1],
            samples: Vec::new(),
            summaries: vec![Summary::video("avc1", 640, 480)],
            timescale: 25600,
            fail_timeline: false,
            unreadable: Vec::new(),
            missing_summaries: Vec::new(),
            timeline_built: false,
            calls: Rc::new(Cell::new(0)),
            live,
        }
    }

    /// Evenly spaced samples with CTS equal to DTS, all on description 1.
    pub fn with_uniform_samples(count: usize, delta: u32) -> Self {
        let mut engine = Self::new();
        engine.samples = (0..count)
            .map(|i| FakeSample {
                dts: i as u64 * delta as u64,
                cts: i as u64 * delta as u64,
                duration: delta,
                index: 1,
                size: 100 + i as u32,
            })
            .collect();
        engine
    }

    fn touch(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn has_track(&self, track_id: u32) -> bool {
        self.track_ids.contains(&track_id)
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl MediaEngine for FakeEngine {
    fn read_file(&mut self) -> EngineResult<FileMode> {
        self.touch();
        Ok(self.modes)
    }

    fn track_id(&self, position: u32) -> Option<u32> {
        self.touch();
        let index = position.checked_sub(1)? as usize;
        self.track_ids.get(index).copied()
    }

    fn construct_timeline(&mut self, track_id: u32) -> EngineResult<()> {
        self.touch();
        if self.fail_timeline {
            return Err(EngineError::InvalidData("broken sample table".to_string()));
        }
        if !self.has_track(track_id) {
            return Err(EngineError::TrackNotFound(track_id));
        }
        self.timeline_built = true;
        Ok(())
    }

    fn sample(&mut self, track_id: u32, sample_number: u32) -> Option<Sample> {
        self.touch();
        if !self.timeline_built || !self.has_track(track_id) {
            return None;
        }
        if self.unreadable.contains(&sample_number) {
            return None;
        }
        let sample = self.samples.get(sample_number.checked_sub(1)? as usize)?;
        Some(Sample {
            data: Bytes::from(vec![0u8; sample.size as usize]),
            dts: sample.dts,
            cts: sample.cts,
            index: sample.index,
            is_sync: sample_number == 1,
        })
    }

    fn sample_exists(&self, _track_id: u32, sample_number: u32) -> bool {
        self.touch();
        sample_number >= 1 && sample_number as usize <= self.samples.len()
    }

    fn summary(&self, _track_id: u32, description_index: u32) -> Option<Summary> {
        self.touch();
        if self.missing_summaries.contains(&description_index) {
            return None;
        }
        self.summaries
            .get(description_index.checked_sub(1)? as usize)
            .cloned()
    }

    fn max_sample_size(&self, _track_id: u32) -> u32 {
        self.touch();
        self.samples.iter().map(|s| s.size).max().unwrap_or(0)
    }

    fn media_timescale(&self, _track_id: u32) -> u32 {
        self.touch();
        self.timescale
    }

    fn last_sample_delta(&self, _track_id: u32) -> EngineResult<u32> {
        self.touch();
        self.samples
            .last()
            .map(|s| s.duration)
            .ok_or_else(|| EngineError::InvalidData("empty timeline".to_string()))
    }

    fn media_timestamps(&self, _track_id: u32) -> EngineResult<TimestampList> {
        self.touch();
        Ok(TimestampList::new(
            self.samples
                .iter()
                .map(|s| MediaTimestamp {
                    dts: s.dts,
                    cts: s.cts,
                })
                .collect(),
        ))
    }
}
