use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

// Header magic numbers: two zero bytes, type code 0x08 (unsigned byte), number of dimensions
pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// One image, stored row by row
pub type Image = Vec<Vec<u8>>;

// The decoded dataset. images and labels are parallel arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnist {
    pub images: Vec<Image>,
    pub labels: Vec<u8>,
    pub rows: usize,
    pub cols: usize,
}

impl Mnist {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

// Contents of an image file, before it is paired with its labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    pub images: Vec<Image>,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Images,
    Labels,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Images => f.write_str("image"),
            FileKind::Labels => f.write_str("label"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{kind} file header is truncated: got {len} bytes, need {need}")]
    TruncatedHeader { kind: FileKind, len: usize, need: usize },

    #[error("{kind} file has magic number {found:#010x}, expected {expected:#010x}")]
    BadMagic {
        kind: FileKind,
        expected: u32,
        found: u32,
    },

    #[error("image file declares empty {rows}x{cols} images")]
    EmptyImage { rows: usize, cols: usize },

    #[error("images must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("{kind} file declares {count} items, which does not fit in memory")]
    TooLarge { kind: FileKind, count: usize },

    #[error("{kind} file declares {count} items ({expected} bytes) but has {actual} bytes of data")]
    SizeMismatch {
        kind: FileKind,
        count: usize,
        expected: usize,
        actual: usize,
    },

    #[error("found {images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },
}

// Parse the fixed header: the magic number followed by N big-endian u32 fields.
// Returns the fields and the remaining payload.
fn parse_header<const N: usize>(
    data: &[u8],
    kind: FileKind,
    magic: u32,
) -> Result<([usize; N], &[u8]), FormatError> {
    let need = 4 * (N + 1);
    if data.len() < need {
        return Err(FormatError::TruncatedHeader {
            kind,
            len: data.len(),
            need,
        });
    }

    let (header, payload) = data.split_at(need);
    let mut words = header
        .chunks_exact(4)
        .map(|word| u32::from_be_bytes([word[0], word[1], word[2], word[3]]));

    let found = words.next().unwrap_or_default();
    if found != magic {
        return Err(FormatError::BadMagic {
            kind,
            expected: magic,
            found,
        });
    }

    let mut fields = [0_usize; N];
    for (field, word) in fields.iter_mut().zip(words) {
        *field = word as usize;
    }
    Ok((fields, payload))
}

// Check that the payload holds exactly `count` records of `record_size` bytes
fn check_payload(
    payload: &[u8],
    kind: FileKind,
    count: usize,
    record_size: usize,
) -> Result<(), FormatError> {
    let expected = count
        .checked_mul(record_size)
        .ok_or(FormatError::TooLarge { kind, count })?;
    if payload.len() != expected {
        return Err(FormatError::SizeMismatch {
            kind,
            count,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

// Decode the contents of an image file
pub fn parse_images(data: &[u8]) -> Result<ImageSet, FormatError> {
    let ([count, rows, cols], payload) =
        parse_header::<3>(data, FileKind::Images, IMAGE_MAGIC)?;
    if rows != cols {
        return Err(FormatError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(FormatError::EmptyImage { rows, cols });
    }

    let image_size = rows.checked_mul(cols).ok_or(FormatError::TooLarge {
        kind: FileKind::Images,
        count,
    })?;
    check_payload(payload, FileKind::Images, count, image_size)?;

    let images: Vec<Image> = payload
        .chunks_exact(image_size)
        .map(|image| image.chunks_exact(cols).map(<[u8]>::to_vec).collect())
        .collect();

    Ok(ImageSet { images, rows, cols })
}

// Decode the contents of a label file
pub fn parse_labels(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let ([count], payload) = parse_header::<1>(data, FileKind::Labels, LABEL_MAGIC)?;
    check_payload(payload, FileKind::Labels, count, 1)?;
    Ok(payload.to_vec())
}

// Read a whole file, inflating it first if it is gzip compressed
fn read_file(path: &Path) -> Result<Vec<u8>, FormatError> {
    let io_error = |source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    };

    let raw = fs::read(path).map_err(io_error)?;
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }

    log::debug!("Decompressing {}", path.display());
    let mut data = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut data)
        .map_err(io_error)?;
    Ok(data)
}

pub fn read_images(path: impl AsRef<Path>) -> Result<ImageSet, FormatError> {
    parse_images(&read_file(path.as_ref())?)
}

pub fn read_labels(path: impl AsRef<Path>) -> Result<Vec<u8>, FormatError> {
    parse_labels(&read_file(path.as_ref())?)
}

// Load an MNIST image file and its label file.
// Either file being malformed fails the whole load.
pub fn load_mnist(
    images_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
) -> Result<Mnist, FormatError> {
    let ImageSet { images, rows, cols } = read_images(images_path)?;
    let labels = read_labels(labels_path)?;

    if images.len() != labels.len() {
        return Err(FormatError::CountMismatch {
            images: images.len(),
            labels: labels.len(),
        });
    }

    Ok(Mnist {
        images,
        labels,
        rows,
        cols,
    })
}
