use much::error::Error;
use much::tensors::Tensor;
use rand::{SeedableRng, rngs::StdRng};

#[test]
fn test_tensor_construction() {
    let t = Tensor::new(&[2, 3, 4], true).unwrap();

    assert_eq!(t.shape(), &[2, 3, 4]);
    assert_eq!(t.capacity(), 24);
    assert_eq!(t.data().len(), t.capacity());
    assert_eq!(t.grad().map(<[f32]>::len), Some(24));
}

#[test]
fn test_shape_data_mismatch_is_an_error() {
    let err = Tensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0], false).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn test_fill_and_zero_grad() {
    let mut t = Tensor::new(&[3], true).unwrap();
    t.fill(2.5);
    t.grad_mut().unwrap().fill(4.0);
    t.zero_grad();

    assert_eq!(t.data(), &[2.5, 2.5, 2.5]);
    assert_eq!(t.grad(), Some(&[0.0, 0.0, 0.0][..]));
}

#[test]
fn test_randomize_normal_is_seeded() {
    let mut a = Tensor::new(&[7], false).unwrap();
    let mut b = Tensor::new(&[7], false).unwrap();
    a.randomize_normal(&mut StdRng::seed_from_u64(11), 0.0, 1.0);
    b.randomize_normal(&mut StdRng::seed_from_u64(11), 0.0, 1.0);

    assert_eq!(a, b);
    assert!(a.data().iter().any(|&x| x != 0.0));
}

#[test]
fn test_split_mut_exposes_data_and_grad() {
    let mut t = Tensor::from_vec(&[2], vec![1.0, 2.0], true).unwrap();
    let (data, grad) = t.split_mut();
    data[0] = grad.unwrap()[0] + 10.0;

    assert_eq!(t.data(), &[10.0, 2.0]);
}
