//! Synthesised MP4 files for the integration tests.

use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};

use bytes::Bytes;
use mp4::{
    AacConfig, AudioObjectType, AvcConfig, ChannelConfig, MediaConfig, Mp4Config, Mp4Sample,
    Mp4Writer, SampleFreqIndex, TrackConfig, TrackType,
};

pub const VIDEO_TIMESCALE: u32 = 25600;

/// Installs a test logger once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mp4_config() -> Mp4Config {
    Mp4Config {
        major_brand: str::parse("isom").unwrap(),
        minor_version: 512,
        compatible_brands: vec![
            str::parse("isom").unwrap(),
            str::parse("iso2").unwrap(),
            str::parse("avc1").unwrap(),
            str::parse("mp41").unwrap(),
        ],
        timescale: 1000,
    }
}

fn write_track(track: TrackConfig, durations: &[u32], sizes: &[usize]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = Mp4Writer::write_start(cursor, &mp4_config()).unwrap();
        writer.add_track(&track).unwrap();

        let mut start_time = 0u64;
        for (i, (&duration, &size)) in durations.iter().zip(sizes).enumerate() {
            let sample = Mp4Sample {
                start_time,
                duration,
                rendering_offset: 0,
                is_sync: i == 0,
                bytes: Bytes::from(vec![i as u8; size]),
            };
            writer.write_sample(1, &sample).unwrap();
            start_time += duration as u64;
        }
        writer.write_end().unwrap();
    }
    buffer
}

/// An H.264 track whose samples last `durations` ticks at
/// [`VIDEO_TIMESCALE`] and carry `sizes` bytes each.
pub fn video_mp4(durations: &[u32], sizes: &[usize]) -> Vec<u8> {
    let track = TrackConfig {
        track_type: TrackType::Video,
        timescale: VIDEO_TIMESCALE,
        language: "und".to_string(),
        media_conf: MediaConfig::AvcConfig(AvcConfig {
            width: 320,
            height: 240,
            seq_param_set: vec![0x67, 0x64, 0x00, 0x1f, 0xac, 0xd9, 0x40, 0x50],
            pic_param_set: vec![0x68, 0xeb, 0xe3, 0xcb, 0x22, 0xc0],
        }),
    };
    write_track(track, durations, sizes)
}

/// A 48 kHz stereo AAC track of `count` frames of 1024 samples.
pub fn aac_mp4(count: usize) -> Vec<u8> {
    let track = TrackConfig {
        track_type: TrackType::Audio,
        timescale: 48000,
        language: "und".to_string(),
        media_conf: MediaConfig::AacConfig(AacConfig {
            bitrate: 128000,
            profile: AudioObjectType::AacLowComplexity,
            freq_index: SampleFreqIndex::Freq48000,
            chan_conf: ChannelConfig::Stereo,
        }),
    };
    write_track(track, &vec![1024; count], &vec![200; count])
}

/// Copies `data` into an anonymous temporary file rewound to the start.
pub fn temp_file_with(data: &[u8]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(data).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}
