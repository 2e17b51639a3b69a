//! # ISOBMFF/QTFF Importer
//!
//! Pulls access units one at a time from the first track of an ISO base
//! media or QuickTime file, with timestamps divided by the coarsest unit
//! that keeps them exact.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use isobm_importer::{AccessUnit, Importer, Mp4Engine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reader = BufReader::new(File::open("video.mp4")?);
//!
//!     let mut importer: Importer<Mp4Engine<'_, _>> = Importer::default();
//!     importer.probe_reader(&mut reader)?;
//!
//!     loop {
//!         match importer.get_access_unit(1)? {
//!             AccessUnit::Ok(sample) => println!("dts {} cts {}", sample.dts, sample.cts),
//!             AccessUnit::Change(sample) => {
//!                 println!("new description at dts {}", sample.dts);
//!             }
//!             AccessUnit::Eof => break,
//!         }
//!     }
//!     importer.cleanup();
//!
//!     Ok(())
//! }
//! ```

pub mod boxes;
pub mod engine;
pub mod error;
pub mod importer;
pub mod media;
pub mod mp4_engine;
pub mod timebase;

pub use engine::{EngineError, FileMode, MediaEngine, TimestampList};
pub use error::Error;
pub use importer::{AccessUnit, Importer, ImporterConfig, Status, IMPORTER_NAME, TRACK_COUNT};
pub use media::{Sample, Summary, SummaryParams};
pub use mp4_engine::Mp4Engine;

/// Re-export of the Result type specialized for this library
pub type Result<T> = std::result::Result<T, Error>;
