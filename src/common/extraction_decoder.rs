//! Reads `ExtractionMetricsOut.bin`, written once per tile and cycle as soon as
//! the cycle has been imaged, to find how far a run has progressed.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fs,
    io::{self, Cursor},
    path::Path,
};

/// Which tile and cycle one extraction record belongs to. The per-channel
/// focus and intensity values are not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub lane: u16,
    pub tile: u32,
    pub cycle: u16,
}

/// Decode an `ExtractionMetricsOut.bin` file into its records
///
/// Format of the file:
///  1. `u8` version (2 or 3)
///  2. `u8` size of each record in bytes
///  3. version 3 only: `u8` number of channels
///  4. records, each starting with `u16` lane, the tile (`u16` in version 2,
///     `u32` in version 3) and `u16` cycle, followed by focus/intensity values
///
/// A trailing partial record (the instrument is still writing) is ignored.
pub fn extraction_decoder(extraction_path: &Path) -> io::Result<Vec<ExtractionRecord>> {
    let buffer = fs::read(extraction_path)?;
    let mut rdr = Cursor::new(&buffer[..]);

    let version = rdr.read_u8()?;
    let record_size = rdr.read_u8()? as usize;

    let id_size = match version {
        2 => 6,
        3 => {
            let _channels = rdr.read_u8()?;
            8
        }
        v => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported extraction metrics version {}", v),
            ))
        }
    };

    if record_size < id_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("extraction record size {} is too small", record_size),
        ));
    }

    let header_size = rdr.position() as usize;

    buffer[header_size..]
        .chunks_exact(record_size)
        .map(|record| -> io::Result<ExtractionRecord> {
            let mut rec = Cursor::new(record);
            let lane = rec.read_u16::<LittleEndian>()?;
            let tile = if version == 2 {
                rec.read_u16::<LittleEndian>()? as u32
            } else {
                rec.read_u32::<LittleEndian>()?
            };
            let cycle = rec.read_u16::<LittleEndian>()?;

            Ok(ExtractionRecord { lane, tile, cycle })
        })
        .collect()
}

/// The last cycle any tile has been extracted for, 0 before the first one
pub fn max_cycle(records: &[ExtractionRecord]) -> u32 {
    records.iter().map(|r| r.cycle as u32).max().unwrap_or(0)
}
