//! Reads `ErrorMetricsOut.bin`, the PhiX error rate per tile and cycle.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fs,
    io::{self, Cursor},
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorRecord {
    pub lane: u16,
    pub tile: u32,
    pub cycle: u16,
    pub error_rate: f32,
}

/// Decode an `ErrorMetricsOut.bin` file
///
/// Format of the file (version 3):
///  1. `u8` version, `u8` record size (30)
///
/// Other versions fail with `ErrorKind::Unsupported`.
///  2. records of `u16` lane, `u16` tile, `u16` cycle, `f32` error rate and
///     five `u32` counts of reads with 0 to 4 errors (ignored)
pub fn error_decoder(error_path: &Path) -> io::Result<Vec<ErrorRecord>> {
    let buffer = fs::read(error_path)?;
    let mut rdr = Cursor::new(&buffer[..]);

    let version = rdr.read_u8()?;
    let record_size = rdr.read_u8()? as usize;

    if version != 3 {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported error metrics version {}", version),
        ));
    }
    if record_size < 10 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("error metrics record size {} is too small", record_size),
        ));
    }
    if (buffer.len() - 2) % record_size != 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated error metrics record",
        ));
    }

    buffer[2..]
        .chunks_exact(record_size)
        .map(|record| -> io::Result<ErrorRecord> {
            let mut rec = Cursor::new(record);
            Ok(ErrorRecord {
                lane: rec.read_u16::<LittleEndian>()?,
                tile: rec.read_u16::<LittleEndian>()? as u32,
                cycle: rec.read_u16::<LittleEndian>()?,
                error_rate: rec.read_f32::<LittleEndian>()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop_run::test_utils::write_error_v3;

    use tempfile::TempDir;

    #[test]
    fn decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ErrorMetricsOut.bin");
        write_error_v3(&path, &[(1, 1101, 1, 0.25), (1, 1101, 2, 0.5)]);

        let records = error_decoder(&path).unwrap();
        assert_eq!(
            records,
            vec![
                ErrorRecord { lane: 1, tile: 1101, cycle: 1, error_rate: 0.25 },
                ErrorRecord { lane: 1, tile: 1101, cycle: 2, error_rate: 0.5 },
            ]
        );
    }

    #[test]
    #[should_panic(expected = r#"unsupported error metrics version 6"#)]
    fn bad_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ErrorMetricsOut.bin");
        std::fs::write(&path, [6u8, 12]).unwrap();
        error_decoder(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"failed to fill whole buffer"#)]
    fn empty_file() {
        error_decoder(Path::new("test_data/empty_file")).unwrap();
    }
}
