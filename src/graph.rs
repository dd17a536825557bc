//! Arena-backed computation graph.
//!
//! # Graph Arena
//!
//! Every tensor that takes part in differentiation lives in a [`Graph`].
//! Operations append their output as a new node whose predecessor edges are
//! plain indices into the arena, so a tensor consumed by many operations is
//! shared by reference without any ownership juggling.
//!
//! ## Lifetime Model
//!
//! - Parameters are inserted once and live as long as the graph.
//! - A training step takes a [`Checkpoint`], builds its subgraph, runs the
//!   backward pass, and then [`Graph::rewind`]s to the checkpoint, dropping
//!   the whole step's subgraph at once.
//! - Edges only point to older nodes. A rewind therefore never drops a
//!   predecessor of a surviving node, and cycles cannot be built.
//!
//! ## Stale Handles
//!
//! A [`TensorId`] remembers which graph issued it and the epoch of that
//! graph at the time. Rewinding starts a new epoch, so a handle into a
//! discarded region is rejected with [`Error::InvalidState`] even after its
//! slot is reused, and so is a handle presented to a different graph.
//! Epochs never wrap: once a graph has used all of them, further rewinds
//! that would drop tensors fail instead.

use crate::error::{Error, Result};
use crate::ops::dispatch::GradRule;
use crate::tensors::Tensor;
use core::ops::Index;
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(0);

/// Handle to a tensor stored in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId {
    pub(crate) index: usize,
    graph: u32,
    epoch: u32,
}

impl TensorId {
    /// Position of the node in its arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// A position in the arena that [`Graph::rewind`] can return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    len: usize,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) tensor: Tensor,
    pub(crate) rule: Option<GradRule>,
    pub(crate) predecessors: Vec<TensorId>,
    epoch: u32,
}

/// Arena of tensors plus the edges recorded between them.
#[derive(Debug)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    id: u32,
    epoch: u32,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
        }
    }
}

impl Graph {
    /// Creates an empty graph with its own handle namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf tensor.
    pub fn insert(&mut self, tensor: Tensor) -> TensorId {
        self.push(Node {
            tensor,
            rule: None,
            predecessors: Vec::new(),
            epoch: self.epoch,
        })
    }

    /// Adds an operation output.
    ///
    /// Outputs that do not require gradients are stored as leaves so the
    /// recorded graph only contains edges that can carry gradient.
    pub(crate) fn record(&mut self, tensor: Tensor, rule: GradRule, predecessors: Vec<TensorId>) -> TensorId {
        debug_assert!(!predecessors.is_empty());
        if !tensor.requires_grad() {
            return self.insert(tensor);
        }
        log::trace!("record {rule:?} <- {predecessors:?}");
        self.push(Node {
            tensor,
            rule: Some(rule),
            predecessors,
            epoch: self.epoch,
        })
    }

    fn push(&mut self, node: Node) -> TensorId {
        let id = TensorId {
            index: self.nodes.len(),
            graph: self.id,
            epoch: node.epoch,
        };
        self.nodes.push(node);
        id
    }

    pub(crate) fn node(&self, id: TensorId) -> Result<&Node> {
        if id.graph != self.id {
            return Err(Error::InvalidState("tensor handle belongs to another graph"));
        }
        self.nodes
            .get(id.index)
            .filter(|node| node.epoch == id.epoch)
            .ok_or(Error::InvalidState("tensor handle refers to a discarded node"))
    }

    /// Borrows a tensor.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn tensor(&self, id: TensorId) -> Result<&Tensor> {
        self.node(id).map(|node| &node.tensor)
    }

    /// Mutably borrows a tensor.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn tensor_mut(&mut self, id: TensorId) -> Result<&mut Tensor> {
        self.node(id)?;
        Ok(&mut self.nodes[id.index].tensor)
    }

    /// The nodes `id` was computed from; empty for leaves.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn predecessors(&self, id: TensorId) -> Result<&[TensorId]> {
        self.node(id).map(|node| node.predecessors.as_slice())
    }

    /// The gradient rule recorded for `id`, if any.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn rule(&self, id: TensorId) -> Result<Option<GradRule>> {
        self.node(id).map(|node| node.rule)
    }

    /// Whether `id` is a leaf (no gradient rule).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn is_leaf(&self, id: TensorId) -> Result<bool> {
        self.node(id).map(|node| node.rule.is_none())
    }

    /// Zeroes the gradient buffer of `id`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `id` was discarded by a rewind.
    pub fn zero_grad(&mut self, id: TensorId) -> Result<()> {
        self.tensor_mut(id)?.zero_grad();
        Ok(())
    }

    /// Number of tensors currently alive in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no tensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Marks the current end of the arena.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.nodes.len(),
        }
    }

    /// Drops every tensor created after `checkpoint`.
    ///
    /// Handles issued before the checkpoint stay valid; handles issued after
    /// it become stale. A checkpoint at or past the end is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the graph has run out of epochs. The arena
    /// is left untouched in that case.
    pub fn rewind(&mut self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.len >= self.nodes.len() {
            return Ok(());
        }
        let epoch = self
            .epoch
            .checked_add(1)
            .ok_or(Error::InvalidState("graph epochs exhausted"))?;
        log::debug!(
            "rewinding graph from {} to {} tensors",
            self.nodes.len(),
            checkpoint.len
        );
        self.nodes.truncate(checkpoint.len);
        self.epoch = epoch;
        Ok(())
    }
}

impl Index<TensorId> for Graph {
    type Output = Tensor;

    /// # Panics
    ///
    /// Panics on a stale handle, like out-of-bounds slice indexing.
    fn index(&self, id: TensorId) -> &Tensor {
        match self.tensor(id) {
            Ok(tensor) => tensor,
            Err(_) => panic!("stale tensor handle {id:?}"),
        }
    }
}
