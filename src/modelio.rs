//! Saving and loading of layer weights.
//!
//! # Weight File Format
//!
//! The file is the plain concatenation of every parameter, as little-endian
//! `f32`, in network order:
//!
//! ```text
//! ┌────────────────┬──────────────┬────────────────┬─────
//! │ layer 0 weight │ layer 0 bias │ layer 1 weight │ …
//! │ [f32; out·in]  │ [f32; out]   │ [f32; out·in]  │
//! └────────────────┴──────────────┴────────────────┴─────
//! ```
//!
//! ## Limitations
//! - No header, shapes, or version: the file is only meaningful together
//!   with the exact architecture that wrote it
//! - The only integrity check on load is the total byte count
//!
//! # Example
//!
//! ```rust
//! use much::graph::Graph;
//! use much::modelio::{load_weights, save_weights};
//! use much::nn::Linear;
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! fn main() -> Result<(), much::error::Error> {
//!     let mut rng = StdRng::seed_from_u64(0);
//!     let mut graph = Graph::new();
//!     let layer = Linear::new(&mut graph, 4, 2, &mut rng)?;
//!
//!     let path = std::env::temp_dir().join("much_doc_weights.bin");
//!     save_weights(&path, &graph, &[&layer])?;
//!     load_weights(&path, &mut graph, &[&layer])?;
//!     # std::fs::remove_file(&path)?;
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::nn::Linear;
use crate::tensors::TensorFloat;
use briny::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const FLOAT_BYTES: usize = size_of::<TensorFloat>();

/// A raw weight blob together with the parameter count it must hold.
struct PackedWeights {
    bytes: Vec<u8>,
    expected: usize,
}

impl Validate for PackedWeights {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.bytes.len() != self.expected * FLOAT_BYTES {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Writes the parameters of `layers` to `path`.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be created or written
/// - [`Error::InvalidState`] if a layer handle is stale
pub fn save_weights(path: impl AsRef<Path>, graph: &Graph, layers: &[&Linear]) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufWriter::new(File::create(path)?);
    write_weights(&mut file, graph, layers)?;
    file.flush()?;

    log::info!("saved {} layers to {}", layers.len(), path.display());
    Ok(())
}

/// Writes the parameters of `layers` to any writer.
///
/// # Errors
///
/// See [`save_weights`].
pub fn write_weights(writer: &mut impl Write, graph: &Graph, layers: &[&Linear]) -> Result<()> {
    for layer in layers {
        for id in layer.parameters() {
            for &value in graph.tensor(id)?.data() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Reads parameters from `path` into the tensors of `layers`.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be opened or read
/// - [`Error::MalformedInput`] if the file size does not match the layers
/// - [`Error::InvalidState`] if a layer handle is stale
pub fn load_weights(path: impl AsRef<Path>, graph: &mut Graph, layers: &[&Linear]) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufReader::new(File::open(path)?);
    read_weights(&mut file, graph, layers)?;

    log::info!("loaded {} layers from {}", layers.len(), path.display());
    Ok(())
}

/// Reads parameters from any reader into the tensors of `layers`.
///
/// The graph is only modified once the whole blob has been validated.
///
/// # Errors
///
/// See [`load_weights`].
pub fn read_weights(reader: &mut impl Read, graph: &mut Graph, layers: &[&Linear]) -> Result<()> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let expected = layers.iter().map(|layer| layer.num_params()).sum();
    let trusted = TrustedData::new(PackedWeights { bytes, expected }).map_err(|_| {
        Error::MalformedInput(format!("weight file does not hold {expected} parameters"))
    })?;
    let packed = trusted.into_inner();

    let mut values = packed
        .bytes
        .chunks_exact(FLOAT_BYTES)
        .map(|chunk| TensorFloat::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));

    for layer in layers {
        for id in layer.parameters() {
            for (dst, src) in graph.tensor_mut(id)?.data_mut().iter_mut().zip(&mut values) {
                *dst = src;
            }
        }
    }

    Ok(())
}
