use approx::assert_relative_eq;
use much::error::Error;
use much::graph::Graph;
use much::mnist::{self, Dataset, IMAGE_MAGIC, LABEL_MAGIC};
use much::modelio;
use much::nn::{ActivationKind, Adam, Linear, Sequence};
use much::tensors::Tensor;
use much::train::{TrainConfig, Trainer};
use rand::{SeedableRng, rngs::StdRng};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("much_{}_{name}", std::process::id()))
}

fn synthetic_dataset(samples: usize, class: usize) -> Dataset {
    let mut dataset = Dataset::default();
    for i in 0..samples {
        let pixels: Vec<f32> = (0..784)
            .map(|j| 0.01 * ((j * 7 + i * 3) % 5 + 1) as f32)
            .collect();
        let mut one_hot = vec![0.0; 10];
        one_hot[class] = 1.0;

        dataset.images.push(Tensor::from_vec(&[784, 1], pixels, false).unwrap());
        dataset.labels.push(Tensor::from_vec(&[10, 1], one_hot, false).unwrap());
    }
    dataset
}

fn small_config() -> TrainConfig {
    TrainConfig {
        layer_sizes: vec![784, 16, 10],
        activation: ActivationKind::LeakyRelu,
        learning_rate: 0.001,
        epochs: 2,
        seed: 42,
        log_every: 0,
        ..TrainConfig::default()
    }
}

#[test]
fn two_passes_strictly_decrease_total_loss() {
    let data = synthetic_dataset(4, 3);
    let mut trainer = Trainer::new(small_config()).unwrap();

    let stats = trainer.fit(&data).unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].samples, 4);
    assert!(stats[0].total_loss.is_finite());
    assert!(
        stats[1].total_loss < stats[0].total_loss,
        "loss went from {} to {}",
        stats[0].total_loss,
        stats[1].total_loss
    );
}

#[test]
fn training_is_reproducible_with_a_fixed_seed() {
    let data = synthetic_dataset(4, 7);

    let run = || {
        let mut trainer = Trainer::new(small_config()).unwrap();
        trainer.fit(&data).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn adam_constant_gradient_sequence() {
    const LR: f32 = 0.01;
    let mut graph = Graph::new();
    let p = graph.insert(Tensor::from_vec(&[1], vec![0.5], true).unwrap());
    let mut adam = Adam::new(1);

    let mut values = Vec::new();
    for _ in 0..3 {
        graph.tensor_mut(p).unwrap().grad_mut().unwrap()[0] = 1.0;
        adam.update_params(&mut graph, &[p], LR).unwrap();
        values.push(graph[p].data()[0]);
    }

    // closed form with g = 1: m̂ = v̂ = 1 at every step
    let (b1, b2, eps) = (0.9f64, 0.999f64, 1e-8f64);
    let (mut m, mut v, mut x) = (0.0f64, 0.0f64, 0.5f64);
    for (t, got) in (1..=3).zip(&values) {
        m = b1 * m + (1.0 - b1);
        v = b2 * v + (1.0 - b2);
        let m_hat = m / (1.0 - b1.powi(t));
        let v_hat = v / (1.0 - b2.powi(t));
        x -= f64::from(LR) * m_hat / (v_hat.sqrt() + eps);
        assert_relative_eq!(f64::from(*got), x, epsilon = 1e-6);
    }
    assert_relative_eq!(values[2], 0.47, epsilon = 1e-5);
    assert_eq!(adam.step(), 3);
}

#[test]
fn adam_for_layer_updates_weight_then_bias() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut graph = Graph::new();
    let layer = Linear::new(&mut graph, 2, 2, &mut rng).unwrap();
    let before_w = graph[layer.weight()].data().to_vec();

    graph.tensor_mut(layer.bias()).unwrap().grad_mut().unwrap().fill(1.0);
    let mut adam = Adam::for_layer(&layer);
    adam.update(&mut graph, &layer, 0.1).unwrap();

    assert_eq!(graph[layer.weight()].data(), before_w.as_slice());
    for &b in graph[layer.bias()].data() {
        assert_relative_eq!(b, -0.1, epsilon = 1e-6);
    }

    let other = Linear::new(&mut graph, 3, 2, &mut rng).unwrap();
    assert!(matches!(
        adam.update(&mut graph, &other, 0.1),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn weights_round_trip_through_a_file() {
    let data = synthetic_dataset(2, 1);
    let path = temp_path("round_trip.bin");

    let mut trained = Trainer::new(small_config()).unwrap();
    trained.fit_epoch(&data).unwrap();
    trained.save_weights(&path).unwrap();

    let bytes = std::fs::metadata(&path).unwrap().len();
    assert_eq!(bytes, ((784 * 16 + 16 + 16 * 10 + 10) * 4) as u64);

    let mut restored = Trainer::new(TrainConfig {
        seed: 7,
        ..small_config()
    })
    .unwrap();
    restored.load_weights(&path).unwrap();

    for (a, b) in trained.model().linears().zip(restored.model().linears()) {
        for (pa, pb) in a.parameters().into_iter().zip(b.parameters()) {
            assert_eq!(trained.graph()[pa].data(), restored.graph()[pb].data());
        }
    }
    assert_eq!(
        trained.predict(&data.images[0]).unwrap(),
        restored.predict(&data.images[0]).unwrap()
    );

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn weights_for_another_architecture_are_rejected() {
    let path = temp_path("mismatch.bin");
    let mut rng = StdRng::seed_from_u64(1);
    let mut graph = Graph::new();
    let small = Sequence::mlp(&mut graph, &[4, 3, 2], ActivationKind::Sigmoid, 1.0, &mut rng).unwrap();
    let large = Sequence::mlp(&mut graph, &[4, 5, 2], ActivationKind::Sigmoid, 1.0, &mut rng).unwrap();

    let small_layers: Vec<&Linear> = small.linears().collect();
    let large_layers: Vec<&Linear> = large.linears().collect();
    modelio::save_weights(&path, &graph, &small_layers).unwrap();

    let err = modelio::load_weights(&path, &mut graph, &large_layers).unwrap_err();
    assert!(matches!(err, Error::MalformedInput(_)));

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        modelio::load_weights(&path, &mut graph, &small_layers),
        Err(Error::Io(_))
    ));
}

#[test]
fn loads_idx_files_and_trains_on_them() {
    let images_path = temp_path("images.idx");
    let labels_path = temp_path("labels.idx");

    let mut images: Vec<u8> = [IMAGE_MAGIC, 3, 28, 28].iter().flat_map(|v| v.to_be_bytes()).collect();
    let mut labels: Vec<u8> = [LABEL_MAGIC, 3].iter().flat_map(|v| v.to_be_bytes()).collect();
    for i in 0..3u8 {
        images.extend(std::iter::repeat_n(i * 40, 784));
        labels.push(i);
    }
    std::fs::write(&images_path, &images).unwrap();
    std::fs::write(&labels_path, &labels).unwrap();

    let data = mnist::load_dataset(&images_path, &labels_path).unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data.images[2].shape(), &[784, 1]);
    assert_relative_eq!(data.images[2].data()[0], 80.0 / 255.0);
    assert_eq!(data.labels[1].argmax(), 1);

    let mut trainer = Trainer::new(TrainConfig {
        epochs: 1,
        ..small_config()
    })
    .unwrap();
    trainer.fit(&data).unwrap();
    let accuracy = trainer.evaluate(&data).unwrap();
    assert!((0.0..=100.0).contains(&accuracy));

    std::fs::remove_file(&images_path).unwrap();
    std::fs::remove_file(&labels_path).unwrap();
}
