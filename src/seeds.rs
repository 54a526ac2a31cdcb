//! Seed files: the durable mailbox used by the cross-block seed exchange.
//!
//! A seed file holds a flat sequence of little-endian `i32` (x, y) pairs.
//! The z coordinate is shared by every record in one file and lives only in
//! the file name, `<prefix>_<z>`, where z is a signed decimal integer; it
//! may be negative, one plane below the image. Files are created by the
//! block that emits seeds for a destination z and consumed-and-deleted at
//! the start of the next iteration. Emission merges into an existing file,
//! since two one-plane-deep blocks can address the same destination plane
//! in the same round.

use crate::core::error::OpError;
use crate::core::types::{Coord, Vec3};
use glob::glob;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

// Serializes read-union-rewrite cycles on seed files, so two blocks of one
// round merging into the same destination plane cannot interleave.
static MERGE_LOCK: Mutex<()> = Mutex::new(());

/// Path of the seed file addressed to plane `z` under `prefix`.
pub fn seed_path(prefix: &str, z: Coord) -> PathBuf {
    PathBuf::from(format!("{}_{}", prefix, z))
}

/// Write seeds addressed to plane `z`.
///
/// Only x and y are stored; z is encoded in the file name. An existing file
/// at the same address is replaced.
pub fn write_seeds(prefix: &str, z: Coord, seeds: &[Vec3]) -> Result<(), OpError> {
    let path = seed_path(prefix, z);
    let mut bytes = Vec::with_capacity(seeds.len() * 8);
    for seed in seeds {
        bytes.extend_from_slice(&(seed.x as i32).to_le_bytes());
        bytes.extend_from_slice(&(seed.y as i32).to_le_bytes());
    }
    fs::write(&path, bytes).map_err(|source| OpError::SeedIo { path, source })
}

/// Read the seeds addressed to plane `z`, forcing that z onto every record.
///
/// A missing file is an empty seed set, not an error.
pub fn read_seeds(prefix: &str, z: Coord) -> Result<Vec<Vec3>, OpError> {
    let path = seed_path(prefix, z);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(OpError::SeedIo { path, source }),
    };

    let mut seeds = Vec::with_capacity(bytes.len() / 8);
    for record in bytes.chunks_exact(8) {
        let x = i32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let y = i32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        seeds.push(Vec3::new(x as Coord, y as Coord, z));
    }
    Ok(seeds)
}

/// Merge seeds into the file addressed to plane `z`, creating it if absent.
///
/// Blocks one plane deep make their low and high faces coincide, so block
/// k and block k+2 both emit toward plane k+1 in the same round; replacing
/// the file would drop the earlier block's set. The existing records are
/// read back, unioned with `seeds`, deduplicated and rewritten, under a
/// process-wide lock.
pub fn merge_seeds(prefix: &str, z: Coord, seeds: &[Vec3]) -> Result<(), OpError> {
    if seeds.is_empty() {
        return Ok(());
    }
    let _guard = MERGE_LOCK.lock();
    let mut all = read_seeds(prefix, z)?;
    all.extend_from_slice(seeds);
    all.sort_unstable_by_key(|p| (p.y, p.x));
    all.dedup();
    write_seeds(prefix, z, &all)
}

/// True if a seed file addressed to plane `z` exists under `prefix`.
pub fn seed_file_exists(prefix: &str, z: Coord) -> bool {
    seed_path(prefix, z).exists()
}

/// All seed files currently present under `prefix`.
pub fn list_seed_files(prefix: &str) -> Vec<PathBuf> {
    let pattern = format!("{}_*", glob::Pattern::escape(prefix));
    match glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(_) => Vec::new(),
    }
}

/// Delete every seed file under `prefix`; returns how many were removed.
pub fn remove_seed_files(prefix: &str) -> Result<usize, OpError> {
    let mut removed = 0;
    for path in list_seed_files(prefix) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(OpError::SeedIo { path, source }),
        }
    }
    Ok(removed)
}

/// The source/target file-prefix pair driving one seed-exchange loop.
///
/// Each iteration consumes files under `source` and emits under `target`;
/// [`SeedPrefixes::swap`] exchanges the roles between iterations.
#[derive(Debug, Clone)]
pub struct SeedPrefixes {
    /// Prefix whose files are consumed by the current iteration.
    pub source: String,
    /// Prefix receiving newly emitted seeds.
    pub target: String,
}

impl SeedPrefixes {
    /// Create a unique prefix pair under the given directory.
    pub fn new_in(dir: &Path) -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        let base = dir.join(format!("fill_seeds_{}", &tag[..12]));
        let base = base.to_string_lossy().into_owned();
        Self {
            source: format!("{}_a", base),
            target: format!("{}_b", base),
        }
    }

    /// Create a unique prefix pair in the system temp directory.
    pub fn temporary() -> Self {
        Self::new_in(&std::env::temp_dir())
    }

    /// Exchange the source and target roles.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.source, &mut self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip_preserves_points() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("seeds").to_string_lossy().into_owned();

        let seeds = vec![Vec3::new(1, 2, 7), Vec3::new(-3, 40, 7), Vec3::new(0, 0, 7)];
        write_seeds(&prefix, 7, &seeds).unwrap();

        let back = read_seeds(&prefix, 7).unwrap();
        assert_eq!(back, seeds);
    }

    #[test]
    fn test_missing_file_is_empty_set() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("none").to_string_lossy().into_owned();
        assert_eq!(read_seeds(&prefix, 3).unwrap(), Vec::new());
        assert!(!seed_file_exists(&prefix, 3));
    }

    #[test]
    fn test_negative_z_address() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("seeds").to_string_lossy().into_owned();
        write_seeds(&prefix, -1, &[Vec3::new(5, 6, -1)]).unwrap();
        assert!(seed_path(&prefix, -1).ends_with("seeds_-1"));
        assert_eq!(read_seeds(&prefix, -1).unwrap(), vec![Vec3::new(5, 6, -1)]);
    }

    #[test]
    fn test_merge_unions_with_existing_file() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("seeds").to_string_lossy().into_owned();

        write_seeds(&prefix, 4, &[Vec3::new(0, 0, 4), Vec3::new(2, 0, 4)]).unwrap();
        // A second emitter toward the same plane must not replace the file.
        merge_seeds(&prefix, 4, &[Vec3::new(2, 0, 4), Vec3::new(1, 1, 4)]).unwrap();

        let all = read_seeds(&prefix, 4).unwrap();
        assert_eq!(
            all,
            vec![Vec3::new(0, 0, 4), Vec3::new(2, 0, 4), Vec3::new(1, 1, 4)]
        );

        // Merging into a missing file just creates it; empty input is a no-op.
        merge_seeds(&prefix, 9, &[Vec3::new(5, 5, 9)]).unwrap();
        assert_eq!(read_seeds(&prefix, 9).unwrap().len(), 1);
        merge_seeds(&prefix, 10, &[]).unwrap();
        assert!(!seed_file_exists(&prefix, 10));
    }

    #[test]
    fn test_list_and_remove_by_prefix() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().into_owned();
        let other = dir.path().join("other").to_string_lossy().into_owned();

        write_seeds(&prefix, 0, &[Vec3::ZERO]).unwrap();
        write_seeds(&prefix, 5, &[Vec3::ZERO]).unwrap();
        write_seeds(&other, 1, &[Vec3::ZERO]).unwrap();

        assert_eq!(list_seed_files(&prefix).len(), 2);
        assert_eq!(remove_seed_files(&prefix).unwrap(), 2);
        assert!(list_seed_files(&prefix).is_empty());
        // Files under a different prefix are untouched.
        assert_eq!(list_seed_files(&other).len(), 1);
    }

    #[test]
    fn test_prefix_swap() {
        let mut p = SeedPrefixes {
            source: "a".into(),
            target: "b".into(),
        };
        p.swap();
        assert_eq!(p.source, "b");
        assert_eq!(p.target, "a");
    }
}
