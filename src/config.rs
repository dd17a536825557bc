//! Command-line configuration of the `much` trainer.

use crate::mnist::NUM_CLASSES;
use crate::nn::ActivationKind;
use crate::tensors::TensorFloat;
use crate::train::TrainConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Activation placed between linear layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Activation {
    /// Leaky `ReLU` with slope `0.01`.
    LeakyRelu,
    /// Logistic sigmoid.
    Sigmoid,
}

impl From<Activation> for ActivationKind {
    fn from(value: Activation) -> Self {
        match value {
            Activation::LeakyRelu => Self::LeakyRelu,
            Activation::Sigmoid => Self::Sigmoid,
        }
    }
}

/// Train a feed-forward network on MNIST.
#[derive(Debug, Clone, Parser)]
#[command(name = "much")]
#[command(about = "Train a small feed-forward network on MNIST")]
#[command(version)]
pub struct Args {
    /// Training images (IDX format)
    #[arg(long, default_value = "train-images-idx3-ubyte")]
    pub train_images: PathBuf,

    /// Training labels (IDX format)
    #[arg(long, default_value = "train-labels-idx1-ubyte")]
    pub train_labels: PathBuf,

    /// Test images (IDX format)
    #[arg(long, default_value = "t10k-images-idx3-ubyte")]
    pub test_images: PathBuf,

    /// Test labels (IDX format)
    #[arg(long, default_value = "t10k-labels-idx1-ubyte")]
    pub test_labels: PathBuf,

    /// Passes over the training set
    #[arg(short, long, default_value_t = 1)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(short, long, default_value_t = 0.001)]
    pub learning_rate: TensorFloat,

    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [128, 64])]
    pub hidden: Vec<usize>,

    /// Activation between layers
    #[arg(long, value_enum, default_value_t = Activation::LeakyRelu)]
    pub activation: Activation,

    /// Standard deviation of the initial weights
    #[arg(long, default_value_t = 1.0)]
    pub init_std: TensorFloat,

    /// Seed for weight initialization
    #[arg(short, long, default_value_t = 0)]
    pub seed: u64,

    /// Only train on the first N samples
    #[arg(long)]
    pub limit: Option<usize>,

    /// Log the running loss every N samples (0 disables)
    #[arg(long, default_value_t = 1000)]
    pub log_every: usize,

    /// Where to write the trained weights
    #[arg(short, long, default_value = "weights.bin")]
    pub weights: PathBuf,
}

impl Args {
    /// Library-level configuration for an input of `input_len` features.
    #[must_use]
    pub fn train_config(&self, input_len: usize) -> TrainConfig {
        let mut layer_sizes = Vec::with_capacity(self.hidden.len() + 2);
        layer_sizes.push(input_len);
        layer_sizes.extend(&self.hidden);
        layer_sizes.push(NUM_CLASSES);

        TrainConfig {
            layer_sizes,
            activation: self.activation.into(),
            learning_rate: self.learning_rate,
            epochs: self.epochs,
            seed: self.seed,
            init_std: self.init_std,
            log_every: self.log_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let args = Args::parse_from(["much"]);
        let config = args.train_config(784);

        assert_eq!(config.layer_sizes, vec![784, 128, 64, 10]);
        assert_eq!(config.activation, ActivationKind::LeakyRelu);
        assert_eq!(config.epochs, 1);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(args.weights, PathBuf::from("weights.bin"));
        assert!(args.limit.is_none());
    }

    #[test]
    fn hidden_layers_are_comma_separated() {
        let args = Args::parse_from(["much", "--hidden", "32,16,8", "--activation", "sigmoid"]);
        let config = args.train_config(4);

        assert_eq!(config.layer_sizes, vec![4, 32, 16, 8, 10]);
        assert_eq!(config.activation, ActivationKind::Sigmoid);
    }

    #[test]
    fn command_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
