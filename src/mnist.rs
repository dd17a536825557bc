//! MNIST IDX loader.
//!
//! Reads the big-endian IDX files that ship the MNIST digits:
//!
//! - images: magic `2051`, count, rows, cols, then `count × rows × cols` pixel bytes
//! - labels: magic `2049`, count, then `count` label bytes
//!
//! Each image becomes a `[rows × cols, 1]` column vector scaled to `[0, 1]`,
//! each label a `[10, 1]` one-hot vector. Neither tracks gradients.

use crate::error::{Error, Result};
use crate::tensors::{Tensor, TensorFloat};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Magic number opening an IDX image file.
pub const IMAGE_MAGIC: u32 = 2051;
/// Magic number opening an IDX label file.
pub const LABEL_MAGIC: u32 = 2049;
/// Number of digit classes, and the length of each one-hot label.
pub const NUM_CLASSES: usize = 10;

/// Paired image and label tensors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// `[pixels, 1]` column vectors scaled to `[0, 1]`.
    pub images: Vec<Tensor>,
    /// `[10, 1]` one-hot vectors, one per image.
    pub labels: Vec<Tensor>,
}

impl Dataset {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the dataset holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterates `(image, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Tensor, &Tensor)> {
        self.images.iter().zip(&self.labels)
    }

    /// Keeps at most the first `n` samples.
    pub fn truncate(&mut self, n: usize) {
        self.images.truncate(n);
        self.labels.truncate(n);
    }
}

/// Loads a dataset from an image file and a label file.
///
/// # Errors
///
/// - [`Error::Io`] if either file cannot be opened or read
/// - [`Error::MalformedInput`] on a bad header, truncated data, or mismatched counts
pub fn load_dataset(images: impl AsRef<Path>, labels: impl AsRef<Path>) -> Result<Dataset> {
    let (images, labels) = (images.as_ref(), labels.as_ref());
    log::info!("loading {} and {}", images.display(), labels.display());

    let image_file = BufReader::new(File::open(images)?);
    let label_file = BufReader::new(File::open(labels)?);
    from_readers(image_file, label_file)
}

/// Parses a dataset from two IDX streams.
///
/// # Errors
///
/// - [`Error::Io`] on read failures other than a short stream
/// - [`Error::MalformedInput`] on a bad header, truncated data, or mismatched counts
/// - [`Error::AllocationFailure`] if the declared image size cannot be buffered
pub fn from_readers(mut images: impl Read, mut labels: impl Read) -> Result<Dataset> {
    expect_magic(&mut images, IMAGE_MAGIC, "image")?;
    let count = read_len(&mut images)?;
    let rows = read_len(&mut images)?;
    let cols = read_len(&mut images)?;

    expect_magic(&mut labels, LABEL_MAGIC, "label")?;
    let label_count = read_len(&mut labels)?;

    if count != label_count {
        return Err(Error::MalformedInput(format!(
            "{count} images but {label_count} labels"
        )));
    }

    let pixels = rows
        .checked_mul(cols)
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::MalformedInput(format!("invalid image size {rows}x{cols}")))?;

    // header counts are untrusted: grow as samples arrive
    let mut dataset = Dataset::default();
    let mut raw = Vec::new();
    raw.try_reserve_exact(pixels)?;
    raw.resize(pixels, 0u8);
    let mut label = [0u8; 1];

    for i in 0..count {
        read_exact(&mut images, &mut raw, "image")?;
        let data: Vec<TensorFloat> = raw.iter().map(|&b| TensorFloat::from(b) / 255.0).collect();
        dataset.images.push(Tensor::from_vec(&[pixels, 1], data, false)?);

        read_exact(&mut labels, &mut label, "label")?;
        let class = usize::from(label[0]);
        if class >= NUM_CLASSES {
            return Err(Error::MalformedInput(format!("label {class} at index {i} out of range")));
        }
        let mut one_hot = vec![0.0; NUM_CLASSES];
        one_hot[class] = 1.0;
        dataset.labels.push(Tensor::from_vec(&[NUM_CLASSES, 1], one_hot, false)?);
    }

    log::debug!("parsed {count} samples of {rows}x{cols}");
    Ok(dataset)
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::MalformedInput(format!("truncated {what} stream")),
        _ => Error::Io(e),
    })
}

fn read_u32(reader: &mut impl Read, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, what)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_len(reader: &mut impl Read) -> Result<usize> {
    let n = read_u32(reader, "header")?;
    usize::try_from(n).map_err(|_| Error::MalformedInput(format!("header field {n} too large")))
}

fn expect_magic(reader: &mut impl Read, expected: u32, what: &str) -> Result<()> {
    let magic = read_u32(reader, what)?;
    if magic != expected {
        return Err(Error::MalformedInput(format!(
            "bad {what} magic {magic}, expected {expected}"
        )));
    }
    Ok(())
}
