//! Dataset file decoders: MNIST `idx3-ubyte` images and SIFT `fvecs`.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::{Matrix, VicinityError};

/// Magic number of an idx3-ubyte image file.
const MNIST_MAGIC: u32 = 0x0000_0803;

/// Largest record dimension accepted from an fvecs header.
const FVECS_MAX_DIM: i32 = 65_536;

/// Load MNIST images as a matrix with one flattened image per row.
///
/// The header is big-endian: magic `0x00000803`, image count, rows, cols.
/// Pixels load as f32 either raw (0..255) or normalized to `[0, 1]`.
pub fn load_mnist(path: &Path, normalize: bool) -> Result<Matrix, VicinityError> {
    let mut reader = BufReader::new(File::open(path)?);

    let magic = read_header_u32(&mut reader)?;
    if magic != MNIST_MAGIC {
        return Err(VicinityError::MalformedDataset(format!(
            "mnist: wrong magic {:#010x} (expected {:#010x})",
            magic, MNIST_MAGIC
        )));
    }
    let n = read_header_u32(&mut reader)? as usize;
    let rows = read_header_u32(&mut reader)? as usize;
    let cols = read_header_u32(&mut reader)? as usize;
    if rows == 0 || cols == 0 {
        return Err(VicinityError::MalformedDataset(
            "mnist: invalid image size".to_string(),
        ));
    }
    let d = rows.checked_mul(cols).filter(|&d| d <= i32::MAX as usize).ok_or_else(|| {
        VicinityError::MalformedDataset("mnist: image dimension overflows".to_string())
    })?;

    let mut data = Vec::with_capacity(n.checked_mul(d).ok_or_else(|| {
        VicinityError::MalformedDataset("mnist: dataset size overflows".to_string())
    })?);
    let mut pixels = vec![0u8; d];
    for _ in 0..n {
        reader.read_exact(&mut pixels).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                VicinityError::MalformedDataset(
                    "mnist: unexpected EOF while reading pixels".to_string(),
                )
            } else {
                VicinityError::Io(err)
            }
        })?;
        if normalize {
            data.extend(pixels.iter().map(|&p| f32::from(p) / 255.0));
        } else {
            data.extend(pixels.iter().map(|&p| f32::from(p)));
        }
    }

    tracing::debug!(n, d, normalize, "loaded mnist dataset");
    Matrix::new(n, d, data)
}

/// Load an fvecs file: little-endian records of `[i32 dim][dim x f32]`.
///
/// All records must share one dimension. EOF between records ends the file
/// normally; EOF inside a record is an error, as is a file with no records.
pub fn load_fvecs(path: &Path) -> Result<Matrix, VicinityError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut data = Vec::new();
    let mut common_d: Option<usize> = None;
    let mut n = 0usize;

    loop {
        let d = match reader.read_i32::<LittleEndian>() {
            Ok(d) => d,
            // EOF at a record boundary is normal termination.
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(VicinityError::Io(err)),
        };
        if d <= 0 || d > FVECS_MAX_DIM {
            return Err(VicinityError::MalformedDataset(format!(
                "fvecs: invalid dimension {}",
                d
            )));
        }
        let d = d as usize;
        match common_d {
            None => common_d = Some(d),
            Some(expected) if expected != d => {
                return Err(VicinityError::MalformedDataset(format!(
                    "fvecs: mixed dimensions {} and {}",
                    expected, d
                )));
            }
            Some(_) => {}
        }

        let start = data.len();
        data.resize(start + d, 0.0);
        reader
            .read_f32_into::<LittleEndian>(&mut data[start..])
            .map_err(|err| {
                if err.kind() == io::ErrorKind::UnexpectedEof {
                    VicinityError::MalformedDataset(
                        "fvecs: unexpected EOF inside a vector".to_string(),
                    )
                } else {
                    VicinityError::Io(err)
                }
            })?;
        n += 1;
    }

    let d = common_d.ok_or_else(|| {
        VicinityError::MalformedDataset("fvecs: file contains zero vectors".to_string())
    })?;

    tracing::debug!(n, d, "loaded fvecs dataset");
    Matrix::new(n, d, data)
}

fn read_header_u32<R: Read>(reader: &mut R) -> Result<u32, VicinityError> {
    reader.read_u32::<BigEndian>().map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            VicinityError::MalformedDataset("unexpected EOF in header".to_string())
        } else {
            VicinityError::Io(err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn write_fvecs(records: &[Vec<f32>]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for record in records {
            file.write_i32::<LittleEndian>(record.len() as i32).unwrap();
            for &v in record {
                file.write_f32::<LittleEndian>(v).unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_fvecs_round_trip() {
        let records = vec![vec![1.0f32, 2.0, 3.0], vec![-4.5, 0.0, 7.25]];
        let file = write_fvecs(&records);
        let m = load_fvecs(file.path()).unwrap();
        assert_eq!(m.n(), 2);
        assert_eq!(m.d(), 3);
        assert_eq!(m.row(0), &records[0][..]);
        assert_eq!(m.row(1), &records[1][..]);
    }

    #[test]
    fn test_fvecs_mixed_dimensions_rejected() {
        let file = write_fvecs(&[vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            load_fvecs(file.path()),
            Err(VicinityError::MalformedDataset(_))
        ));
    }

    #[test]
    fn test_fvecs_truncated_record_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_i32::<LittleEndian>(4).unwrap();
        file.write_f32::<LittleEndian>(1.0).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_fvecs(file.path()),
            Err(VicinityError::MalformedDataset(_))
        ));
    }

    #[test]
    fn test_fvecs_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            load_fvecs(file.path()),
            Err(VicinityError::MalformedDataset(_))
        ));
    }

    fn write_mnist(n: u32, rows: u32, cols: u32, pixels: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_u32::<BigEndian>(MNIST_MAGIC).unwrap();
        file.write_u32::<BigEndian>(n).unwrap();
        file.write_u32::<BigEndian>(rows).unwrap();
        file.write_u32::<BigEndian>(cols).unwrap();
        file.write_all(pixels).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_mnist_raw_and_normalized() {
        let file = write_mnist(2, 1, 2, &[0, 255, 128, 64]);

        let raw = load_mnist(file.path(), false).unwrap();
        assert_eq!(raw.n(), 2);
        assert_eq!(raw.d(), 2);
        assert_eq!(raw.row(0), &[0.0, 255.0]);
        assert_eq!(raw.row(1), &[128.0, 64.0]);

        let normalized = load_mnist(file.path(), true).unwrap();
        assert_eq!(normalized.row(0), &[0.0, 1.0]);
        assert!((normalized.row(1)[0] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_mnist_wrong_magic_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_u32::<BigEndian>(0x0000_0801).unwrap();
        file.write_u32::<BigEndian>(0).unwrap();
        file.write_u32::<BigEndian>(1).unwrap();
        file.write_u32::<BigEndian>(1).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_mnist(file.path(), false),
            Err(VicinityError::MalformedDataset(_))
        ));
    }

    #[test]
    fn test_mnist_short_pixels_rejected() {
        let file = write_mnist(2, 1, 2, &[1, 2, 3]);
        assert!(matches!(
            load_mnist(file.path(), false),
            Err(VicinityError::MalformedDataset(_))
        ));
    }
}
