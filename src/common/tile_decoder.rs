//! Reads `TileMetricsOut.bin` into per-tile cluster counts, densities and
//! alignment rates.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Cursor},
    path::Path,
};

/// Everything known about one tile. Missing values stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileRecord {
    /// clusters per mm²
    pub density: Option<f32>,
    pub cluster_count: Option<f32>,
    pub cluster_count_pf: Option<f32>,
    /// % of clusters aligned to PhiX, keyed by read number
    pub percent_aligned: BTreeMap<u32, f32>,
}

/// Tile metrics keyed by (lane, tile)
pub type TileMetrics = BTreeMap<(u16, u32), TileRecord>;

const CODE_DENSITY: u16 = 100;
const CODE_CLUSTER_COUNT: u16 = 102;
const CODE_CLUSTER_COUNT_PF: u16 = 103;
const CODE_PERCENT_ALIGNED: u16 = 300;

/// Decode a `TileMetricsOut.bin` file
///
/// Version 2:
///  1. `u8` version, `u8` record size (10)
///  2. records of `u16` lane, `u16` tile, `u16` metric code, `f32` value.
///     Codes: 100 density, 102 clusters, 103 clusters PF,
///     `300 + n` % aligned for read `n + 1`; other codes are ignored.
///
/// Version 3:
///  1. `u8` version, `u8` record size (15), `f32` tile area in mm²
///  2. records of `u16` lane, `u32` tile, `u8` record type followed by
///     `f32` clusters and `f32` clusters PF (type `t`) or
///     `u32` read number and `f32` % aligned (type `r`)
pub fn tile_decoder(tile_path: &Path) -> io::Result<TileMetrics> {
    let buffer = fs::read(tile_path)?;
    let mut rdr = Cursor::new(&buffer[..]);

    let version = rdr.read_u8()?;
    let record_size = rdr.read_u8()? as usize;

    let mut tiles = TileMetrics::new();

    match version {
        2 => {
            if record_size < 10 {
                return Err(bad_record_size(record_size));
            }
            for record in buffer[2..].chunks_exact(record_size) {
                let mut rec = Cursor::new(record);
                let lane = rec.read_u16::<LittleEndian>()?;
                let tile = rec.read_u16::<LittleEndian>()? as u32;
                let code = rec.read_u16::<LittleEndian>()?;
                let value = rec.read_f32::<LittleEndian>()?;

                let entry = tiles.entry((lane, tile)).or_default();
                match code {
                    CODE_DENSITY => entry.density = Some(value),
                    CODE_CLUSTER_COUNT => entry.cluster_count = Some(value),
                    CODE_CLUSTER_COUNT_PF => entry.cluster_count_pf = Some(value),
                    c if (CODE_PERCENT_ALIGNED..CODE_PERCENT_ALIGNED + 100).contains(&c) => {
                        let read = (c - CODE_PERCENT_ALIGNED) as u32 + 1;
                        entry.percent_aligned.insert(read, value);
                    }
                    _ => {}
                }
            }
        }
        3 => {
            if record_size < 15 {
                return Err(bad_record_size(record_size));
            }
            let area = rdr.read_f32::<LittleEndian>()?;
            for record in buffer[6..].chunks_exact(record_size) {
                let mut rec = Cursor::new(record);
                let lane = rec.read_u16::<LittleEndian>()?;
                let tile = rec.read_u32::<LittleEndian>()?;
                let code = rec.read_u8()?;

                match code {
                    b't' => {
                        let clusters = rec.read_f32::<LittleEndian>()?;
                        let clusters_pf = rec.read_f32::<LittleEndian>()?;
                        let entry = tiles.entry((lane, tile)).or_default();
                        entry.cluster_count = Some(clusters);
                        entry.cluster_count_pf = Some(clusters_pf);
                        if area > 0.0 {
                            entry.density = Some(clusters / area);
                        }
                    }
                    b'r' => {
                        let read = rec.read_u32::<LittleEndian>()?;
                        let aligned = rec.read_f32::<LittleEndian>()?;
                        tiles
                            .entry((lane, tile))
                            .or_default()
                            .percent_aligned
                            .insert(read, aligned);
                    }
                    _ => {}
                }
            }
        }
        v => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported tile metrics version {}", v),
            ))
        }
    }

    Ok(tiles)
}

fn bad_record_size(record_size: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("tile metrics record size {} is too small", record_size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop_run::test_utils::{write_tile_v2, write_tile_v3};

    use tempfile::TempDir;

    #[test]
    fn decode_v2() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TileMetricsOut.bin");
        write_tile_v2(
            &path,
            &[
                (1, 1101, 100, 250_000.0),
                (1, 1101, 101, 200_000.0),
                (1, 1101, 102, 1_000.0),
                (1, 1101, 103, 800.0),
                (1, 1101, 200, 0.1),
                (1, 1101, 301, 2.5),
            ],
        );

        let tiles = tile_decoder(&path).unwrap();
        let tile = &tiles[&(1, 1101)];
        assert_eq!(tile.density, Some(250_000.0));
        assert_eq!(tile.cluster_count, Some(1_000.0));
        assert_eq!(tile.cluster_count_pf, Some(800.0));
        assert_eq!(tile.percent_aligned.get(&2), Some(&2.5));
        assert_eq!(tile.percent_aligned.get(&1), None);
    }

    #[test]
    fn decode_v3() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TileMetricsOut.bin");
        write_tile_v3(
            &path,
            2.0,
            &[(1, 1_101_001, 1_000.0, 600.0)],
            &[(1, 1_101_001, 1, 1.5), (1, 1_101_001, 3, 1.25)],
        );

        let tiles = tile_decoder(&path).unwrap();
        let tile = &tiles[&(1, 1_101_001)];
        assert_eq!(tile.density, Some(500.0));
        assert_eq!(tile.cluster_count_pf, Some(600.0));
        assert_eq!(tile.percent_aligned.len(), 2);
        assert_eq!(tile.percent_aligned[&3], 1.25);
    }

    #[test]
    #[should_panic(expected = r#"unsupported tile metrics version 1"#)]
    fn bad_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TileMetricsOut.bin");
        std::fs::write(&path, [1u8, 10]).unwrap();
        tile_decoder(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"failed to fill whole buffer"#)]
    fn empty_file() {
        tile_decoder(Path::new("test_data/empty_file")).unwrap();
    }
}
