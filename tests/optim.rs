use gannet::layers::{DenseLayer, Layer};
use gannet::math::Matrix;
use gannet::optim::{Adam, Optimiser, Sgd};
use gannet::rng::StdRandom;
use gannet::{Error, EPSILON};

/// Layer `2 -> 1` with weights `[1, 2]` and gradient `[0.5, 1.0]`.
fn primed_layer(rng: &mut StdRandom) -> DenseLayer {
    let mut layer = DenseLayer::new(2, 1, None, rng).unwrap();
    layer
        .set_weights(Matrix::from_vec(2, 1, vec![1.0, 2.0]).unwrap())
        .unwrap();
    layer
        .forward(&Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap())
        .unwrap();
    layer
        .backward(&Matrix::from_vec(1, 1, vec![0.5]).unwrap())
        .unwrap();
    layer
}

#[test]
fn sgd_steps_against_gradient() {
    let mut rng = StdRandom::seeded(1);
    let mut layer = primed_layer(&mut rng);
    let mut sgd = Sgd::new(0.1).unwrap();
    sgd.update(&mut layer).unwrap();
    let w = layer.weights();
    assert!((w[0] - 0.95).abs() < 1e-12);
    assert!((w[1] - 1.9).abs() < 1e-12);
}

#[test]
fn adam_first_step_matches_closed_form() {
    let mut rng = StdRandom::seeded(1);
    let mut layer = primed_layer(&mut rng);
    let (lr, b1, b2) = (0.01, 0.9, 0.999);
    let mut adam = Adam::with_betas(lr, b1, b2).unwrap();
    adam.update(&mut layer).unwrap();
    assert_eq!(adam.iteration(), 1);

    for (i, (w0, g)) in [(1.0f64, 0.5f64), (2.0, 1.0)].into_iter().enumerate() {
        let m = (1.0 - b1) * g;
        let v = (1.0 - b2) * g * g;
        let lr_t = lr * (1.0 - b2).sqrt() / (1.0 - b1);
        let expected = w0 - lr_t * m / (v.sqrt() + EPSILON);
        assert!((layer.weights()[i] - expected).abs() < 1e-12);
    }

    let (m, v) = adam.moments(layer.id(), "weights").unwrap();
    assert!((m[1] - 0.1).abs() < 1e-12);
    assert!((v[1] - 0.001).abs() < 1e-12);
}

#[test]
fn adam_keys_state_by_layer_identity() {
    let mut rng = StdRandom::seeded(4);
    let mut a = primed_layer(&mut rng);
    let mut b = DenseLayer::new(2, 1, None, &mut rng).unwrap();
    b.forward(&Matrix::from_vec(1, 2, vec![-3.0, 1.0]).unwrap())
        .unwrap();
    b.backward(&Matrix::ones(1, 1).unwrap()).unwrap();
    assert_eq!(a.name(), b.name());

    let mut adam = Adam::new(0.001).unwrap();
    adam.update(&mut a).unwrap();
    adam.update(&mut b).unwrap();
    assert_eq!(adam.iteration(), 2);

    let (ma, _) = adam.moments(a.id(), "weights").unwrap();
    let (mb, _) = adam.moments(b.id(), "weights").unwrap();
    assert!((ma[0] - 0.05).abs() < 1e-12);
    assert!((mb[0] + 0.3).abs() < 1e-12);
}

#[test]
fn update_without_gradient_fails() {
    let mut rng = StdRandom::seeded(8);
    let mut layer = DenseLayer::new(2, 2, None, &mut rng).unwrap();
    let mut sgd = Sgd::new(0.1).unwrap();
    assert!(matches!(
        sgd.update(&mut layer),
        Err(Error::MissingGradient(_))
    ));
}

#[test]
fn rejects_bad_hyperparameters() {
    assert!(Sgd::new(0.0).is_err());
    assert!(Sgd::new(f64::NAN).is_err());
    assert!(Adam::new(-1.0).is_err());
    assert!(Adam::with_betas(0.1, 1.0, 0.999).is_err());
    assert!(Adam::with_betas(0.1, 0.9, -0.1).is_err());
}

#[test]
fn boxed_optimiser_delegates() {
    let mut rng = StdRandom::seeded(1);
    let mut layer = primed_layer(&mut rng);
    let mut boxed: Box<dyn Optimiser> = Box::new(Sgd::new(0.1).unwrap());
    assert_eq!(boxed.learning_rate(), 0.1);
    boxed.update(&mut layer).unwrap();
    assert!((layer.weights()[0] - 0.95).abs() < 1e-12);
}

#[test]
fn effective_learning_rate_starts_undefined() {
    let mut rng = StdRandom::seeded(1);
    let mut layer = primed_layer(&mut rng);
    let mut adam = Adam::with_betas(0.01, 0.9, 0.999).unwrap();
    assert_eq!(adam.effective_learning_rate(), None);
    adam.update(&mut layer).unwrap();
    let expected = 0.01 * (1.0f64 - 0.999).sqrt() / (1.0 - 0.9);
    assert!((adam.effective_learning_rate().unwrap() - expected).abs() < 1e-15);
}

#[test]
fn adam_keeps_moments_when_an_update_fails() {
    let mut rng = StdRandom::seeded(2);
    let mut layer = primed_layer(&mut rng);
    let mut adam = Adam::new(0.01).unwrap();
    adam.update(&mut layer).unwrap();
    let (m, v) = adam.moments(layer.id(), "weights").unwrap();
    let (m, v) = (m.clone(), v.clone());
    let weights = layer.weights().clone();

    layer
        .state_mut()
        .gradients
        .insert("weights".to_string(), Matrix::ones(3, 1).unwrap());
    assert!(matches!(
        adam.update(&mut layer),
        Err(Error::ShapeMismatch(_))
    ));
    let (m_after, v_after) = adam.moments(layer.id(), "weights").unwrap();
    assert_eq!(m_after, &m);
    assert_eq!(v_after, &v);
    assert_eq!(layer.weights(), &weights);
}
