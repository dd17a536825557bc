//! Linear layers, activations and the sequential container.

use crate::error::Result;
use crate::graph::{Graph, TensorId};
use crate::tensors::{Tensor, TensorFloat};
use rand::Rng;

/// A fully connected layer acting on column vectors.
///
/// Holds handles to a `[out, in]` weight matrix and an `[out]` bias that
/// live in a [`Graph`]. The forward pass computes `weight × x + bias` for an
/// input of shape `[in, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear {
    weight: TensorId,
    bias: TensorId,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Standard deviation of the initial weights.
    pub const DEFAULT_INIT_STD: TensorFloat = 1.0;

    /// Inserts a new layer with `N(0, 1)` weights and zero bias.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`](crate::error::Error::InvalidShape) if either size is zero.
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_std(graph, in_features, out_features, Self::DEFAULT_INIT_STD, rng)
    }

    /// Inserts a new layer with `N(0, std²)` weights and zero bias.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`](crate::error::Error::InvalidShape) if either size is zero.
    pub fn with_std<R: Rng + ?Sized>(
        graph: &mut Graph,
        in_features: usize,
        out_features: usize,
        std: TensorFloat,
        rng: &mut R,
    ) -> Result<Self> {
        let mut weight = Tensor::new(&[out_features, in_features], true)?;
        weight.randomize_normal(rng, 0.0, std);
        let bias = Tensor::new(&[out_features], true)?;

        Ok(Self {
            weight: graph.insert(weight),
            bias: graph.insert(bias),
            in_features,
            out_features,
        })
    }

    /// Records `weight × x + bias`.
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`](crate::error::Error::ShapeMismatch) if `x` is not `[in, 1]`.
    pub fn forward(&self, graph: &mut Graph, x: TensorId) -> Result<TensorId> {
        let product = graph.matmul(self.weight, x)?;
        graph.add(product, self.bias)
    }

    /// Zeroes the weight and bias gradients.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::error::Error::InvalidState) if the layer
    /// belongs to a different graph epoch.
    pub fn zero_grad(&self, graph: &mut Graph) -> Result<()> {
        graph.zero_grad(self.weight)?;
        graph.zero_grad(self.bias)
    }

    /// Parameter handles in optimizer order: weight, then bias.
    #[must_use]
    pub const fn parameters(&self) -> [TensorId; 2] {
        [self.weight, self.bias]
    }

    /// Total number of scalar parameters.
    #[must_use]
    pub const fn num_params(&self) -> usize {
        self.out_features * self.in_features + self.out_features
    }

    /// Handle to the `[out, in]` weight matrix.
    #[must_use]
    pub const fn weight(&self) -> TensorId {
        self.weight
    }

    /// Handle to the `[out]` bias vector.
    #[must_use]
    pub const fn bias(&self) -> TensorId {
        self.bias
    }

    /// Length of the input column vector.
    #[must_use]
    pub const fn in_features(&self) -> usize {
        self.in_features
    }

    /// Length of the output column vector.
    #[must_use]
    pub const fn out_features(&self) -> usize {
        self.out_features
    }
}

/// An enumeration of activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    /// Dispatches to a leaky `ReLU` activation.
    LeakyRelu,
    /// Dispatches to a sigmoid activation.
    Sigmoid,
}

impl ActivationKind {
    /// Records the activation applied to `x`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::error::Error::InvalidState) for a stale handle.
    pub fn forward(self, graph: &mut Graph, x: TensorId) -> Result<TensorId> {
        match self {
            Self::LeakyRelu => graph.leaky_relu(x),
            Self::Sigmoid => graph.sigmoid(x),
        }
    }
}

/// One stage of a [`Sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// An affine map with trainable parameters.
    Linear(Linear),
    /// A parameter-free elementwise nonlinearity.
    Activation(ActivationKind),
}

impl Layer {
    /// Records this stage applied to `x`.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn forward(&self, graph: &mut Graph, x: TensorId) -> Result<TensorId> {
        match self {
            Self::Linear(linear) => linear.forward(graph, x),
            Self::Activation(kind) => kind.forward(graph, x),
        }
    }
}

impl From<Linear> for Layer {
    fn from(linear: Linear) -> Self {
        Self::Linear(linear)
    }
}

impl From<ActivationKind> for Layer {
    fn from(kind: ActivationKind) -> Self {
        Self::Activation(kind)
    }
}

/// An ordered chain of layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    layers: Vec<Layer>,
}

impl Sequence {
    /// Wraps layers that run in the given order.
    #[must_use]
    pub const fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Builds a multilayer perceptron over `sizes`.
    ///
    /// `sizes = [784, 128, 10]` yields `Linear(784→128)`, `activation`,
    /// `Linear(128→10)`. No activation follows the last linear layer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`](crate::error::Error::InvalidShape) for fewer
    /// than two sizes or a zero size.
    pub fn mlp<R: Rng + ?Sized>(
        graph: &mut Graph,
        sizes: &[usize],
        activation: ActivationKind,
        init_std: TensorFloat,
        rng: &mut R,
    ) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(crate::error::Error::InvalidShape(sizes.to_vec()));
        }

        let mut layers = Vec::with_capacity(sizes.len() * 2);
        for (i, pair) in sizes.windows(2).enumerate() {
            if i > 0 {
                layers.push(Layer::Activation(activation));
            }
            layers.push(Layer::Linear(Linear::with_std(graph, pair[0], pair[1], init_std, rng)?));
        }

        Ok(Self::new(layers))
    }

    /// Appends a stage.
    pub fn push(&mut self, layer: impl Into<Layer>) {
        self.layers.push(layer.into());
    }

    /// Records the whole chain applied to `x`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing stage.
    pub fn forward(&self, graph: &mut Graph, x: TensorId) -> Result<TensorId> {
        self.layers
            .iter()
            .try_fold(x, |acc, layer| layer.forward(graph, acc))
    }

    /// Zeroes the gradients of every linear layer.
    ///
    /// # Errors
    ///
    /// Propagates stale-handle errors.
    pub fn zero_grad(&self, graph: &mut Graph) -> Result<()> {
        self.linears().try_for_each(|linear| linear.zero_grad(graph))
    }

    /// The linear layers in network order.
    pub fn linears(&self) -> impl Iterator<Item = &Linear> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Linear(linear) => Some(linear),
            Layer::Activation(_) => None,
        })
    }

    /// Every layer, in forward order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}
