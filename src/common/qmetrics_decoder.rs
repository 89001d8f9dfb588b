//! Reads `QMetricsOut.bin`: a Q-score histogram per tile and cycle, either over
//! all 50 Q values or over the instrument's quality bins.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fs,
    io::{self, Cursor},
    path::Path,
};

/// Number of Q values in an unbinned histogram
pub const MAX_Q: u8 = 50;

/// A range of Q values reported together, and the value they are remapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QScoreBin {
    pub lower: u8,
    pub upper: u8,
    pub value: u8,
}

impl QScoreBin {
    pub fn width(&self) -> u32 {
        (self.upper as u32 + 1).saturating_sub(self.lower as u32).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QRecord {
    pub lane: u16,
    pub tile: u32,
    pub cycle: u16,
    /// one count per entry of `QMetrics::bins`
    pub counts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QMetrics {
    pub version: u8,
    /// whether the instrument bins its quality scores
    pub binned: bool,
    /// the bins every record's counts refer to; one per Q value when unbinned
    pub bins: Vec<QScoreBin>,
    pub records: Vec<QRecord>,
}

fn unbinned() -> Vec<QScoreBin> {
    (1..=MAX_Q)
        .map(|q| QScoreBin { lower: q, upper: q, value: q })
        .collect()
}

/// Decode a `QMetricsOut.bin` file
///
/// Format of the file:
///  1. `u8` version (4 to 7), `u8` record size
///  2. versions 5+: `u8` flag for binned scores; when set, `u8` number of bins
///     followed by the bins' lower bounds, upper bounds and remapped values (`u8` each)
///  3. records of `u16` lane, tile (`u16`, or `u32` from version 7), `u16` cycle
///     and a `u32` histogram. Versions 4 and 5 always store 50 entries indexed by
///     Q value, versions 6+ store one entry per bin.
pub fn qmetrics_decoder(q_path: &Path) -> io::Result<QMetrics> {
    let buffer = fs::read(q_path)?;
    let mut rdr = Cursor::new(&buffer[..]);

    let version = rdr.read_u8()?;
    let record_size = rdr.read_u8()? as usize;

    if !(4..=7).contains(&version) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported q-metrics version {}", version),
        ));
    }

    let mut binned = false;
    let mut bins = unbinned();

    if version >= 5 && rdr.read_u8()? != 0 {
        let bin_count = rdr.read_u8()? as usize;
        let mut lower = vec![0u8; bin_count];
        let mut upper = vec![0u8; bin_count];
        let mut value = vec![0u8; bin_count];
        io::Read::read_exact(&mut rdr, &mut lower)?;
        io::Read::read_exact(&mut rdr, &mut upper)?;
        io::Read::read_exact(&mut rdr, &mut value)?;

        binned = true;
        bins = lower
            .iter()
            .zip(upper.iter())
            .zip(value.iter())
            .map(|((&lower, &upper), &value)| QScoreBin { lower, upper, value })
            .collect();
    }

    let id_size = if version >= 7 { 8 } else { 6 };
    let entries = if version >= 6 { bins.len() } else { MAX_Q as usize };

    if record_size < id_size + 4 * entries {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "q-metrics record size {} cannot hold {} histogram entries",
                record_size, entries
            ),
        ));
    }

    let header_size = rdr.position() as usize;
    let mut records = Vec::new();

    for record in buffer[header_size..].chunks_exact(record_size) {
        let mut rec = Cursor::new(record);
        let lane = rec.read_u16::<LittleEndian>()?;
        let tile = if version >= 7 {
            rec.read_u32::<LittleEndian>()?
        } else {
            rec.read_u16::<LittleEndian>()? as u32
        };
        let cycle = rec.read_u16::<LittleEndian>()?;

        let mut histogram = vec![0u32; entries];
        rec.read_u32_into::<LittleEndian>(&mut histogram)?;

        // version 5 keeps the full 50-slot layout even when binned
        let counts = if binned && version == 5 {
            bins.iter()
                .map(|b| {
                    (b.lower..=b.upper)
                        .filter_map(|q| histogram.get((q as usize).wrapping_sub(1)))
                        .sum::<u32>()
                })
                .collect()
        } else {
            histogram
        };

        records.push(QRecord { lane, tile, cycle, counts });
    }

    Ok(QMetrics { version, binned, bins, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop_run::test_utils::{write_qmetrics_v4, write_qmetrics_v6, NEXTSEQ_BINS};

    use tempfile::TempDir;

    #[test]
    fn decode_v4() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("QMetricsOut.bin");
        write_qmetrics_v4(&path, &[(1, 1101, 1, vec![(2, 5), (35, 10)])]);

        let q = qmetrics_decoder(&path).unwrap();
        assert_eq!(q.version, 4);
        assert!(!q.binned);
        assert_eq!(q.bins.len(), 50);
        assert_eq!(q.bins[34], QScoreBin { lower: 35, upper: 35, value: 35 });
        assert_eq!(q.records.len(), 1);
        assert_eq!(q.records[0].counts[1], 5);
        assert_eq!(q.records[0].counts[34], 10);
        assert_eq!(q.records[0].counts.iter().sum::<u32>(), 15);
    }

    #[test]
    fn decode_v6_binned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("QMetricsOut.bin");
        write_qmetrics_v6(&path, &[(1, 11101, 3, vec![0, 1, 2, 3, 40, 50])]);

        let q = qmetrics_decoder(&path).unwrap();
        assert!(q.binned);
        assert_eq!(q.bins.len(), NEXTSEQ_BINS.len());
        assert_eq!(q.bins[0], QScoreBin { lower: 1, upper: 14, value: 14 });
        assert_eq!(q.bins[0].width(), 14);
        assert_eq!(q.records[0].tile, 11101);
        assert_eq!(q.records[0].counts, vec![0, 1, 2, 3, 40, 50]);
    }

    #[test]
    #[should_panic(expected = r#"unsupported q-metrics version 3"#)]
    fn bad_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("QMetricsOut.bin");
        std::fs::write(&path, [3u8, 206]).unwrap();
        qmetrics_decoder(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"cannot hold 50 histogram entries"#)]
    fn short_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("QMetricsOut.bin");
        std::fs::write(&path, [4u8, 10]).unwrap();
        qmetrics_decoder(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"failed to fill whole buffer"#)]
    fn empty_file() {
        qmetrics_decoder(Path::new("test_data/empty_file")).unwrap();
    }
}
