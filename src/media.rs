//! Samples and sample description summaries handed to the caller.

use bytes::Bytes;

/// One access unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Raw payload.
    pub data: Bytes,
    /// Decode timestamp.
    pub dts: u64,
    /// Composition timestamp.
    pub cts: u64,
    /// Sample description index this sample is coded with.
    pub index: u32,
    /// Whether the sample is a random access point.
    pub is_sync: bool,
}

/// Video decode parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoParams {
    pub width: u16,
    pub height: u16,
    /// Scale factor applied to every delivered timestamp.
    pub timebase: u64,
    /// Native media timescale of the track.
    pub timescale: u32,
}

/// Audio decode parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioParams {
    /// Sampling frequency in Hz; 0 if the entry does not say.
    pub frequency: u32,
    pub channels: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParams {
    Video(VideoParams),
    Audio(AudioParams),
    Other,
}

/// Description of a contiguous run of samples sharing one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Sample entry code, e.g. `avc1` or `mp4a`.
    pub sample_type: String,
    /// Upper bound on the size of one access unit in bytes.
    pub max_au_length: u32,
    pub params: SummaryParams,
}

impl Summary {
    pub fn video(sample_type: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            sample_type: sample_type.into(),
            max_au_length: 0,
            params: SummaryParams::Video(VideoParams {
                width,
                height,
                timebase: 1,
                timescale: 0,
            }),
        }
    }

    pub fn audio(sample_type: impl Into<String>, frequency: u32, channels: u32) -> Self {
        Self {
            sample_type: sample_type.into(),
            max_au_length: 0,
            params: SummaryParams::Audio(AudioParams {
                frequency,
                channels,
            }),
        }
    }

    pub fn other(sample_type: impl Into<String>) -> Self {
        Self {
            sample_type: sample_type.into(),
            max_au_length: 0,
            params: SummaryParams::Other,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.params, SummaryParams::Video(_))
    }

    pub fn video_params(&self) -> Option<&VideoParams> {
        match &self.params {
            SummaryParams::Video(video) => Some(video),
            _ => None,
        }
    }

    /// Rescaled timestamp ticks per second, for video summaries with a known
    /// timescale.
    pub fn frame_rate(&self) -> Option<f64> {
        let video = self.video_params()?;
        if video.timescale == 0 || video.timebase == 0 {
            return None;
        }
        Some(video.timescale as f64 / video.timebase as f64)
    }
}
