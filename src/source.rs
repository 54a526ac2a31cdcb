//! Raw-file image sources.
//!
//! Images live on disk as headerless little-endian pixel buffers whose
//! dimensions are encoded in the file name, `<name>_<W>x<H>x<D>.raw`. The
//! pixel type is inferred from the file size: bytes per pixel must be 1, 2
//! or 4. Layout matches [`Volume`]: x-fastest, then y, then z.

use crate::core::error::{ConfigError, SourceError};
use crate::core::types::{Coord, Scalar, ScalarType, Vec3};
use crate::core::volume::Volume;
use std::fs;
use std::path::{Path, PathBuf};

/// What the source layer knows about one on-disk image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Location of the raw file.
    pub path: PathBuf,
    /// Dimensions parsed from the file name.
    pub dims: Vec3,
    /// Pixel type inferred from the file size.
    pub scalar_type: ScalarType,
}

/// Parse the `_<W>x<H>x<D>` suffix of a file name.
fn parse_dimensions(path: &Path) -> Option<Vec3> {
    let stem = path.file_stem()?.to_str()?;
    let (_, dims) = stem.rsplit_once('_')?;
    let mut parts = dims.split('x');
    let x: Coord = parts.next()?.parse().ok()?;
    let y: Coord = parts.next()?.parse().ok()?;
    let z: Coord = parts.next()?.parse().ok()?;
    if parts.next().is_some() || x < 0 || y < 0 || z < 0 {
        return None;
    }
    Some(Vec3::new(x, y, z))
}

/// Inspect an on-disk image: dimensions from the name, pixel type from the
/// file size.
pub fn volume_info(path: &Path) -> Result<VolumeInfo, SourceError> {
    let meta = fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            SourceError::Io(e)
        }
    })?;
    let dims = parse_dimensions(path).ok_or_else(|| SourceError::NoDimensions {
        path: path.to_path_buf(),
    })?;

    let pixels = dims.pixel_count();
    let len = meta.len();
    if pixels == 0 || len % pixels as u64 != 0 {
        return Err(SourceError::SizeMismatch {
            path: path.to_path_buf(),
            len,
            pixels,
            expected: dims,
        });
    }
    let bytes = (len / pixels as u64) as usize;
    let scalar_type = ScalarType::from_bytes(bytes).ok_or_else(|| SourceError::UnsupportedScalarSize {
        path: path.to_path_buf(),
        bytes,
    })?;

    Ok(VolumeInfo {
        path: path.to_path_buf(),
        dims,
        scalar_type,
    })
}

/// Check that two images agree in dimensions and pixel type, as required
/// when one is the input and the other the output of one operation.
pub fn check_matching_pair(left: &VolumeInfo, right: &VolumeInfo) -> Result<(), ConfigError> {
    if left.dims != right.dims {
        return Err(ConfigError::DimensionMismatch {
            expected: left.dims,
            got: right.dims,
        });
    }
    if left.scalar_type != right.scalar_type {
        return Err(ConfigError::ScalarTypeMismatch {
            left: left.scalar_type,
            right: right.scalar_type,
        });
    }
    Ok(())
}

/// Load a raw image as a [`Volume`] of the requested scalar type.
pub fn read_volume<T: Scalar>(path: &Path) -> Result<Volume<T>, SourceError> {
    let info = volume_info(path)?;
    if info.scalar_type != T::TYPE {
        return Err(SourceError::WrongScalarType {
            path: path.to_path_buf(),
            actual: info.scalar_type,
            requested: T::TYPE,
        });
    }
    let bytes = fs::read(path)?;
    let mut data = Vec::with_capacity(info.dims.pixel_count());
    for chunk in bytes.chunks_exact(T::BYTES) {
        data.push(T::from_le_bytes(chunk));
    }
    Ok(Volume::from_data(info.dims, data))
}

/// Write a volume as `<name>_<W>x<H>x<D>.raw` under `dir`; returns the path.
pub fn write_volume<T: Scalar>(dir: &Path, name: &str, vol: &Volume<T>) -> Result<PathBuf, SourceError> {
    let dims = vol.dims();
    let path = dir.join(format!("{}_{}x{}x{}.raw", name, dims.x, dims.y, dims.z));
    let mut bytes = Vec::with_capacity(vol.byte_count());
    for v in vol.data() {
        v.write_le(&mut bytes);
    }
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(
            parse_dimensions(Path::new("/data/head_256x256x129.raw")),
            Some(Vec3::new(256, 256, 129))
        );
        // Underscores in the name are fine; the last one wins.
        assert_eq!(
            parse_dimensions(Path::new("my_scan_4x5x6.raw")),
            Some(Vec3::new(4, 5, 6))
        );
        assert_eq!(parse_dimensions(Path::new("noname.raw")), None);
        assert_eq!(parse_dimensions(Path::new("bad_4x5.raw")), None);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let mut v: Volume<u16> = Volume::new(Vec3::new(3, 2, 2));
        v.set(Vec3::new(2, 1, 1), 777);
        let path = write_volume(dir.path(), "scan", &v).unwrap();
        assert!(path.to_str().unwrap().ends_with("scan_3x2x2.raw"));

        let info = volume_info(&path).unwrap();
        assert_eq!(info.dims, Vec3::new(3, 2, 2));
        assert_eq!(info.scalar_type, ScalarType::U16);

        let back: Volume<u16> = read_volume(&path).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_wrong_scalar_type_is_rejected() {
        let dir = tempdir().unwrap();
        let v: Volume<u8> = Volume::new(Vec3::splat(2));
        let path = write_volume(dir.path(), "mask", &v).unwrap();
        let err = read_volume::<f32>(&path).unwrap_err();
        assert!(matches!(err, SourceError::WrongScalarType { .. }));
    }

    #[test]
    fn test_size_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad_2x2x2.raw");
        fs::write(&path, vec![0u8; 9]).unwrap(); // 9 bytes for 8 pixels
        assert!(matches!(
            volume_info(&path),
            Err(SourceError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_pair_checks() {
        let a = VolumeInfo {
            path: "a_2x2x2.raw".into(),
            dims: Vec3::splat(2),
            scalar_type: ScalarType::U8,
        };
        let mut b = a.clone();
        assert!(check_matching_pair(&a, &b).is_ok());
        b.scalar_type = ScalarType::F32;
        assert!(matches!(
            check_matching_pair(&a, &b),
            Err(ConfigError::ScalarTypeMismatch { .. })
        ));
        b = a.clone();
        b.dims = Vec3::splat(3);
        assert!(matches!(
            check_matching_pair(&a, &b),
            Err(ConfigError::DimensionMismatch { .. })
        ));
    }
}
