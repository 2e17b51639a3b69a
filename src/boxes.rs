//! Top-level box walk used to classify a file before full parsing.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::engine::FileMode;

const HEADER_SIZE: u64 = 8;
const LARGE_HEADER_SIZE: u64 = 16;

/// A top-level box header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: [u8; 4],
    pub offset: u64,
    pub size: u64,
}

impl BoxHeader {
    /// Structural mode this box contributes.
    pub fn mode(&self) -> FileMode {
        match &self.box_type {
            b"ftyp" => FileMode::BOX,
            b"moov" => FileMode::BOX | FileMode::INITIALIZATION,
            b"moof" => FileMode::FRAGMENTED,
            b"mdat" => FileMode::MEDIA,
            b"sidx" => FileMode::INDEX,
            b"styp" => FileMode::SEGMENT,
            _ => FileMode::empty(),
        }
    }
}

fn is_box_type(box_type: &[u8; 4]) -> bool {
    box_type.iter().all(|&c| c == b' ' || c.is_ascii_graphic() || c == 0xa9)
}

/// Reads top-level box headers from the start of `reader` until the end of
/// the stream or the first bytes that do not look like a box.
pub fn read_top_level<R: Read + Seek>(reader: &mut R, size: u64) -> io::Result<Vec<BoxHeader>> {
    let mut headers = Vec::new();
    let mut pos = 0u64;

    while size.saturating_sub(pos) >= HEADER_SIZE {
        reader.seek(SeekFrom::Start(pos))?;
        let compact_size = reader.read_u32::<BigEndian>()? as u64;
        let mut box_type = [0u8; 4];
        reader.read_exact(&mut box_type)?;
        if !is_box_type(&box_type) {
            break;
        }

        let (box_size, header_size) = match compact_size {
            0 => (size - pos, HEADER_SIZE),
            1 => {
                if size - pos < LARGE_HEADER_SIZE {
                    break;
                }
                (reader.read_u64::<BigEndian>()?, LARGE_HEADER_SIZE)
            }
            n => (n, HEADER_SIZE),
        };
        if box_size < header_size {
            break;
        }

        headers.push(BoxHeader {
            box_type,
            offset: pos,
            size: box_size,
        });
        pos = match pos.checked_add(box_size) {
            Some(next) => next,
            None => break,
        };
    }

    log::trace!("Found {} top-level boxes", headers.len());
    Ok(headers)
}

/// Structural modes of the file behind `reader`. Leaves the read position
/// unspecified.
pub fn scan_file_modes<R: Read + Seek>(reader: &mut R, size: u64) -> io::Result<FileMode> {
    let mut modes = FileMode::empty();
    for header in read_top_level(reader, size)? {
        modes.insert(header.mode());
    }
    Ok(modes)
}
