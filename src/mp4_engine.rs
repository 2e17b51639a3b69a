//! Container engine backed by the `mp4` crate.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::iter;

use mp4::{Mp4Reader, StblBox, TrackType};

use crate::boxes;
use crate::engine::{
    EngineError, EngineResult, FileMode, MediaEngine, MediaTimestamp, TimestampList,
};
use crate::media::{Sample, Summary};

#[derive(Debug, Clone, Copy)]
struct TimelineEntry {
    dts: u64,
    cts: u64,
    duration: u32,
    size: u32,
    index: u32,
    is_sync: bool,
}

/// Per-sample timing and description indices of one track, in decode order.
#[derive(Debug, Default)]
struct Timeline {
    entries: Vec<TimelineEntry>,
}

fn composition_time(dts: u64, offset: i32) -> EngineResult<u64> {
    dts.checked_add_signed(offset as i64).ok_or_else(|| {
        EngineError::InvalidData(format!(
            "composition offset {} puts sample before zero at dts {}",
            offset, dts
        ))
    })
}

/// Expands `(first_chunk, samples_per_chunk, description_index)` runs into
/// one description index per sample. Samples past the last run inherit its
/// index; a missing table means description 1.
fn description_indices<I>(runs: I, sample_count: usize) -> EngineResult<Vec<u32>>
where
    I: IntoIterator<Item = (u32, u32, u32)>,
{
    let mut indices = Vec::new();
    indices.try_reserve_exact(sample_count)?;

    let mut runs = runs.into_iter().peekable();
    let mut last_index = 1;
    while let Some((first_chunk, samples_per_chunk, index)) = runs.next() {
        let remaining = sample_count - indices.len();
        let run = match runs.peek() {
            Some(&(next_chunk, _, _)) => {
                let chunks = next_chunk.saturating_sub(first_chunk) as u64;
                (chunks * samples_per_chunk as u64).min(remaining as u64) as usize
            }
            None => remaining,
        };
        indices.extend(iter::repeat(index).take(run));
        last_index = index;
    }
    indices.resize(sample_count, last_index);
    Ok(indices)
}

impl Timeline {
    fn from_sample_table(stbl: &StblBox) -> EngineResult<Self> {
        let count = stbl.stsz.sample_count as usize;
        let mut entries = Vec::new();
        entries.try_reserve_exact(count)?;

        let indices = description_indices(
            stbl.stsc.entries.iter().map(|e| {
                (e.first_chunk, e.samples_per_chunk, e.sample_description_index)
            }),
            count,
        )?;
        let mut deltas = stbl
            .stts
            .entries
            .iter()
            .flat_map(|e| iter::repeat(e.sample_delta).take(e.sample_count as usize));
        let mut offsets = stbl.ctts.as_ref().map(|ctts| {
            ctts.entries
                .iter()
                .flat_map(|e| iter::repeat(e.sample_offset).take(e.sample_count as usize))
        });

        let mut dts = 0u64;
        for (i, index) in indices.into_iter().enumerate() {
            let duration = deltas.next().ok_or_else(|| {
                EngineError::InvalidData(format!("stts ends before sample {}", i + 1))
            })?;
            let offset = offsets.as_mut().and_then(|it| it.next()).unwrap_or(0);
            let size = if stbl.stsz.sample_size != 0 {
                stbl.stsz.sample_size
            } else {
                stbl.stsz.sample_sizes.get(i).copied().ok_or_else(|| {
                    EngineError::InvalidData(format!("stsz has no size for sample {}", i + 1))
                })?
            };
            let is_sync = stbl
                .stss
                .as_ref()
                .map_or(true, |stss| stss.entries.binary_search(&(i as u32 + 1)).is_ok());

            entries.push(TimelineEntry {
                dts,
                cts: composition_time(dts, offset)?,
                duration,
                size,
                index,
                is_sync,
            });
            dts += duration as u64;
        }
        Ok(Self { entries })
    }

    /// Fragmented tracks: `mp4` only exposes fragment timing through
    /// `read_sample`, so every sample is read once here.
    fn from_fragments<R: Read + Seek>(
        reader: &mut Mp4Reader<R>,
        track_id: u32,
    ) -> EngineResult<Self> {
        let count = reader.sample_count(track_id)?;
        let mut entries = Vec::new();
        entries.try_reserve_exact(count as usize)?;

        for sample_id in 1..=count {
            let Some(sample) = reader.read_sample(track_id, sample_id)? else {
                log::warn!("Fragment sample {} of track {} missing", sample_id, track_id);
                break;
            };
            entries.push(TimelineEntry {
                dts: sample.start_time,
                cts: composition_time(sample.start_time, sample.rendering_offset)?,
                duration: sample.duration,
                size: sample.bytes.len() as u32,
                index: 1,
                is_sync: sample.is_sync,
            });
        }
        Ok(Self { entries })
    }

    fn get(&self, sample_number: u32) -> Option<&TimelineEntry> {
        self.entries.get(sample_number.checked_sub(1)? as usize)
    }
}

/// Engine over a borrowed ISOBMFF/QTFF byte source.
///
/// The engine never owns the source: dropping it releases the parsed box
/// tree and timelines and leaves the caller's reader open.
pub struct Mp4Engine<'a, R> {
    source: Option<&'a mut R>,
    reader: Option<Mp4Reader<&'a mut R>>,
    timelines: HashMap<u32, Timeline>,
}

impl<'a, R: Read + Seek> Mp4Engine<'a, R> {
    /// Attaches `source` in read mode. Nothing is read until
    /// [`MediaEngine::read_file`].
    pub fn attach(source: &'a mut R) -> Self {
        Self {
            source: Some(source),
            reader: None,
            timelines: HashMap::new(),
        }
    }

    fn timeline(&self, track_id: u32) -> EngineResult<&Timeline> {
        self.timelines
            .get(&track_id)
            .ok_or(EngineError::NoTimeline(track_id))
    }
}

impl<'a, R: Read + Seek> MediaEngine for Mp4Engine<'a, R> {
    fn read_file(&mut self) -> EngineResult<FileMode> {
        let source = self
            .source
            .take()
            .ok_or_else(|| EngineError::InvalidData("file already read".to_string()))?;
        let size = source.seek(SeekFrom::End(0))?;
        let modes = boxes::scan_file_modes(&mut *source, size)?;
        if !modes.intersects(FileMode::RECOGNIZED) {
            log::debug!("No recognized top-level boxes in {} bytes", size);
            self.source = Some(source);
            return Ok(modes);
        }

        source.seek(SeekFrom::Start(0))?;
        let reader = Mp4Reader::read_header(source, size)?;
        log::debug!(
            "Parsed {} bytes: {} tracks, {} fragments, modes {:#x}",
            size,
            reader.moov.traks.len(),
            reader.moofs.len(),
            modes.bits()
        );
        self.reader = Some(reader);
        Ok(modes)
    }

    fn track_id(&self, position: u32) -> Option<u32> {
        let reader = self.reader.as_ref()?;
        let trak = reader.moov.traks.get(position.checked_sub(1)? as usize)?;
        Some(trak.tkhd.track_id)
    }

    fn construct_timeline(&mut self, track_id: u32) -> EngineResult<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or(EngineError::TrackNotFound(track_id))?;
        let timeline = if reader.moofs.is_empty() {
            let trak = reader
                .moov
                .traks
                .iter()
                .find(|trak| trak.tkhd.track_id == track_id)
                .ok_or(EngineError::TrackNotFound(track_id))?;
            Timeline::from_sample_table(&trak.mdia.minf.stbl)?
        } else {
            Timeline::from_fragments(reader, track_id)?
        };
        log::debug!(
            "Timeline of track {} has {} samples",
            track_id,
            timeline.entries.len()
        );
        self.timelines.insert(track_id, timeline);
        Ok(())
    }

    fn sample(&mut self, track_id: u32, sample_number: u32) -> Option<Sample> {
        let entry = *self.timelines.get(&track_id)?.get(sample_number)?;
        let reader = self.reader.as_mut()?;
        match reader.read_sample(track_id, sample_number) {
            Ok(Some(sample)) => Some(Sample {
                data: sample.bytes,
                dts: entry.dts,
                cts: entry.cts,
                index: entry.index,
                is_sync: entry.is_sync,
            }),
            Ok(None) => None,
            Err(err) => {
                log::warn!(
                    "Failed to read sample {} of track {}: {}",
                    sample_number,
                    track_id,
                    err
                );
                None
            }
        }
    }

    fn sample_exists(&self, track_id: u32, sample_number: u32) -> bool {
        self.timelines
            .get(&track_id)
            .map_or(false, |timeline| timeline.get(sample_number).is_some())
    }

    fn summary(&self, track_id: u32, description_index: u32) -> Option<Summary> {
        // mp4 keeps only the first entry of stsd.
        if description_index != 1 {
            return None;
        }
        let track = self.reader.as_ref()?.tracks().get(&track_id)?;
        let sample_type = track
            .box_type()
            .map(|fourcc| fourcc.to_string())
            .unwrap_or_default();

        let summary = match track.track_type() {
            Ok(TrackType::Video) => Summary::video(sample_type, track.width(), track.height()),
            Ok(TrackType::Audio) => {
                let frequency = track.sample_freq_index().map_or(0, |index| index.freq());
                let channels = track.channel_config().map_or(0, |config| config as u32);
                Summary::audio(sample_type, frequency, channels)
            }
            _ => Summary::other(sample_type),
        };
        Some(summary)
    }

    fn max_sample_size(&self, track_id: u32) -> u32 {
        self.timelines.get(&track_id).map_or(0, |timeline| {
            timeline.entries.iter().map(|e| e.size).max().unwrap_or(0)
        })
    }

    fn media_timescale(&self, track_id: u32) -> u32 {
        self.reader
            .as_ref()
            .and_then(|reader| {
                reader
                    .moov
                    .traks
                    .iter()
                    .find(|trak| trak.tkhd.track_id == track_id)
            })
            .map_or(0, |trak| trak.mdia.mdhd.timescale)
    }

    fn last_sample_delta(&self, track_id: u32) -> EngineResult<u32> {
        self.timeline(track_id)?
            .entries
            .last()
            .map(|e| e.duration)
            .ok_or_else(|| EngineError::InvalidData(format!("track {} has no samples", track_id)))
    }

    fn media_timestamps(&self, track_id: u32) -> EngineResult<TimestampList> {
        let timeline = self.timeline(track_id)?;
        let mut timestamps = Vec::new();
        timestamps.try_reserve_exact(timeline.entries.len())?;
        timestamps.extend(timeline.entries.iter().map(|e| MediaTimestamp {
            dts: e.dts,
            cts: e.cts,
        }));
        Ok(TimestampList::new(timestamps))
    }
}
