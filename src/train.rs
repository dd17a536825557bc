//! Per-sample training and evaluation loop.
//!
//! # Training Step
//!
//! For every sample the [`Trainer`]:
//! 1. zeroes the gradients of all linear layers
//! 2. records the forward pass and the cross-entropy loss on a fresh region of the graph
//! 3. runs the backward pass from the loss
//! 4. applies one Adam update per linear layer
//! 5. rewinds the graph, dropping everything recorded in steps 2 and 3
//!
//! Only the parameters survive between steps, so the arena never grows
//! beyond one sample's subgraph.

use crate::error::Result;
use crate::graph::Graph;
use crate::mnist::{Dataset, NUM_CLASSES};
use crate::modelio;
use crate::nn::{ActivationKind, Adam, Linear, Sequence};
use crate::tensors::{Tensor, TensorFloat};
use rand::{SeedableRng, rngs::StdRng};
use std::path::Path;

/// Hyperparameters and architecture of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Widths from input to output, e.g. `[784, 128, 64, 10]`.
    pub layer_sizes: Vec<usize>,
    /// Nonlinearity between consecutive linear layers.
    pub activation: ActivationKind,
    /// Adam step size.
    pub learning_rate: TensorFloat,
    /// Passes over the training set made by [`Trainer::fit`].
    pub epochs: usize,
    /// Seed of the weight initialization.
    pub seed: u64,
    /// Standard deviation of the normal weight initialization.
    pub init_std: TensorFloat,
    /// Log the running loss every this many samples; `0` disables it.
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            layer_sizes: vec![784, 128, 64, NUM_CLASSES],
            activation: ActivationKind::LeakyRelu,
            learning_rate: 0.001,
            epochs: 1,
            seed: 0,
            init_std: Linear::DEFAULT_INIT_STD,
            log_every: 1000,
        }
    }
}

/// Summary of one pass over a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// Zero-based index of the pass.
    pub epoch: usize,
    /// Samples seen during the pass.
    pub samples: usize,
    /// Sum of the per-sample losses.
    pub total_loss: TensorFloat,
}

impl EpochStats {
    /// Average loss per sample; `0.0` for an empty pass.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_loss(&self) -> TensorFloat {
        if self.samples == 0 {
            return 0.0;
        }
        self.total_loss / self.samples as TensorFloat
    }
}

/// Owns a network, its optimizers, and the graph they live in.
#[derive(Debug)]
pub struct Trainer {
    graph: Graph,
    model: Sequence,
    optimizers: Vec<Adam>,
    config: TrainConfig,
    epoch: usize,
}

impl Trainer {
    /// Builds and initializes the network described by `config`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`](crate::error::Error::InvalidShape) for an
    /// unusable `layer_sizes`.
    pub fn new(config: TrainConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut graph = Graph::new();
        let model = Sequence::mlp(
            &mut graph,
            &config.layer_sizes,
            config.activation,
            config.init_std,
            &mut rng,
        )?;
        let optimizers = model.linears().map(Adam::for_layer).collect();

        log::info!(
            "built network {:?} with {} parameters",
            config.layer_sizes,
            model.linears().map(Linear::num_params).sum::<usize>()
        );

        Ok(Self {
            graph,
            model,
            optimizers,
            config,
            epoch: 0,
        })
    }

    /// Trains on a single sample and returns its loss before the update.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`](crate::error::Error::ShapeMismatch) if the
    ///   sample does not fit the network
    /// - [`Error::InvalidState`](crate::error::Error::InvalidState) if the
    ///   graph can no longer be rewound
    pub fn step(&mut self, image: &Tensor, label: &Tensor) -> Result<TensorFloat> {
        self.model.zero_grad(&mut self.graph)?;

        let checkpoint = self.graph.checkpoint();
        let result = self.record_step(image, label);
        self.graph.rewind(checkpoint).and(result)
    }

    fn record_step(&mut self, image: &Tensor, label: &Tensor) -> Result<TensorFloat> {
        let graph = &mut self.graph;
        let x = graph.insert(image.clone());
        let target = graph.insert(label.clone());

        let logits = self.model.forward(graph, x)?;
        let loss = graph.cross_entropy(logits, target)?;
        let value = graph.tensor(loss)?.data()[0];

        graph.backward(loss)?;

        for (linear, adam) in self.model.linears().zip(&mut self.optimizers) {
            adam.update(graph, linear, self.config.learning_rate)?;
        }

        Ok(value)
    }

    /// One pass over `data`, one optimizer step per sample.
    ///
    /// # Errors
    ///
    /// Propagates the first failing [`Trainer::step`].
    #[allow(clippy::cast_precision_loss)]
    pub fn fit_epoch(&mut self, data: &Dataset) -> Result<EpochStats> {
        let epoch = self.epoch;
        let mut total_loss = 0.0;

        for (i, (image, label)) in data.iter().enumerate() {
            total_loss += self.step(image, label)?;

            let log_every = self.config.log_every;
            if log_every > 0 && i > 0 && i % log_every == 0 {
                log::info!("epoch {epoch}, item {i}, loss: {:.4}", total_loss / i as TensorFloat);
            }
        }

        let stats = EpochStats {
            epoch,
            samples: data.len(),
            total_loss,
        };
        log::info!("epoch {epoch}, final loss: {:.4}", stats.mean_loss());

        self.epoch += 1;
        Ok(stats)
    }

    /// Runs [`Trainer::fit_epoch`] for the configured number of epochs.
    ///
    /// # Errors
    ///
    /// Propagates the first failing epoch.
    pub fn fit(&mut self, data: &Dataset) -> Result<Vec<EpochStats>> {
        (0..self.config.epochs).map(|_| self.fit_epoch(data)).collect()
    }

    /// Index of the highest logit for `image`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`](crate::error::Error::ShapeMismatch) if the
    ///   image does not fit the network
    /// - [`Error::InvalidState`](crate::error::Error::InvalidState) if the
    ///   graph can no longer be rewound
    pub fn predict(&mut self, image: &Tensor) -> Result<usize> {
        let checkpoint = self.graph.checkpoint();
        let x = self.graph.insert(image.clone());
        let prediction = self
            .model
            .forward(&mut self.graph, x)
            .and_then(|logits| self.graph.tensor(logits).map(Tensor::argmax));
        self.graph.rewind(checkpoint).and(prediction)
    }

    /// Percentage of samples whose predicted class matches the label.
    ///
    /// An empty dataset scores `0.0`.
    ///
    /// # Errors
    ///
    /// Propagates prediction failures.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&mut self, data: &Dataset) -> Result<f32> {
        if data.is_empty() {
            return Ok(0.0);
        }

        let mut correct = 0usize;
        for (image, label) in data.iter() {
            if self.predict(image)? == label.argmax() {
                correct += 1;
            }
        }

        let accuracy = correct as f32 / data.len() as f32 * 100.0;
        log::debug!("{correct}/{} correct", data.len());
        Ok(accuracy)
    }

    /// Writes all linear layers with [`modelio::save_weights`].
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    pub fn save_weights(&self, path: impl AsRef<Path>) -> Result<()> {
        let linears: Vec<&Linear> = self.model.linears().collect();
        modelio::save_weights(path, &self.graph, &linears)
    }

    /// Restores all linear layers with [`modelio::load_weights`].
    ///
    /// # Errors
    ///
    /// Propagates I/O and format failures.
    pub fn load_weights(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let linears: Vec<&Linear> = self.model.linears().collect();
        modelio::load_weights(path, &mut self.graph, &linears)
    }

    /// The graph holding the model parameters.
    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The network being trained.
    #[must_use]
    pub const fn model(&self) -> &Sequence {
        &self.model
    }

    /// The configuration this trainer was built from.
    #[must_use]
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            layer_sizes: vec![4, 3, 2],
            seed: 9,
            log_every: 0,
            ..TrainConfig::default()
        }
    }

    fn sample(values: [f32; 4], class: usize) -> (Tensor, Tensor) {
        let mut one_hot = vec![0.0; 2];
        one_hot[class] = 1.0;
        (
            Tensor::from_vec(&[4, 1], values.to_vec(), false).unwrap(),
            Tensor::from_vec(&[2, 1], one_hot, false).unwrap(),
        )
    }

    #[test]
    fn step_leaves_only_parameters_in_the_graph() {
        let mut trainer = Trainer::new(tiny_config()).unwrap();
        let before = trainer.graph().len();
        let (image, label) = sample([0.1, 0.2, 0.3, 0.4], 1);

        trainer.step(&image, &label).unwrap();

        assert_eq!(trainer.graph().len(), before);
    }

    #[test]
    fn wrong_input_size_rewinds_and_fails() {
        let mut trainer = Trainer::new(tiny_config()).unwrap();
        let before = trainer.graph().len();
        let image = Tensor::new(&[5, 1], false).unwrap();
        let label = Tensor::new(&[2, 1], false).unwrap();

        assert!(trainer.step(&image, &label).is_err());
        assert_eq!(trainer.graph().len(), before);
    }

    #[test]
    fn same_seed_same_network() {
        let a = Trainer::new(tiny_config()).unwrap();
        let b = Trainer::new(tiny_config()).unwrap();

        for (la, lb) in a.model().linears().zip(b.model().linears()) {
            assert_eq!(a.graph()[la.weight()].data(), b.graph()[lb.weight()].data());
        }
    }

    #[test]
    fn evaluate_empty_dataset_is_zero() {
        let mut trainer = Trainer::new(tiny_config()).unwrap();
        assert_eq!(trainer.evaluate(&Dataset::default()).unwrap(), 0.0);
    }
}
