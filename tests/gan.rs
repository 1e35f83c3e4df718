use gannet::cost::BinaryCrossEntropy;
use gannet::layers::{Activation, DenseLayer, Layer, LeakyRelu, Sigmoid, Tanh};
use gannet::logging::LossHistory;
use gannet::math::Matrix;
use gannet::model::Model;
use gannet::models::{build_discriminator, build_generator, Gan};
use gannet::optim::Adam;
use gannet::rng::StdRandom;
use gannet::Error;

const NOISE: usize = 3;
const FEATURES: usize = 6;

fn act<A: Activation + 'static>(a: A) -> Option<Box<dyn Activation>> {
    Some(Box::new(a))
}

fn small_gan(rng: &mut StdRandom) -> Gan {
    let mut g = Model::new(Adam::with_betas(2e-3, 0.5, 0.999).unwrap(), BinaryCrossEntropy::new());
    g.add(DenseLayer::new(NOISE, 8, act(LeakyRelu::new(0.2)), rng).unwrap());
    g.add(DenseLayer::new(8, FEATURES, act(Tanh::new()), rng).unwrap());

    let mut d = Model::new(Adam::with_betas(2e-3, 0.5, 0.999).unwrap(), BinaryCrossEntropy::new());
    d.add(DenseLayer::new(FEATURES, 5, act(LeakyRelu::new(0.2)), rng).unwrap());
    d.add(DenseLayer::new(5, 1, act(Sigmoid::new()), rng).unwrap());
    Gan::new(g, d, NOISE).unwrap()
}

fn weights(model: &Model) -> Vec<Matrix> {
    model
        .layers()
        .iter()
        .map(|l| l.parameters()["weights"].clone())
        .collect()
}

fn real_data(rows: usize, rng: &mut StdRandom) -> Matrix {
    Matrix::uniform(-1.0, 1.0, rows, FEATURES, rng).unwrap()
}

#[test]
fn generator_step_leaves_discriminator_untouched() {
    let mut rng = StdRandom::seeded(17);
    let mut gan = small_gan(&mut rng);
    let noise = gan.noise(4, &mut rng).unwrap();
    let before = gan.generator.predict(&noise).unwrap();
    let disc_before = weights(&gan.discriminator);

    let loss = gan.train_generator(4, &mut rng).unwrap();
    assert!(loss.is_finite());

    let after = gan.generator.predict(&noise).unwrap();
    assert_ne!(before, after);
    assert_eq!(weights(&gan.discriminator), disc_before);
    assert!(gan.discriminator.layers()[0].input_gradient().is_some());
}

#[test]
fn discriminator_step_updates_only_discriminator() {
    let mut rng = StdRandom::seeded(5);
    let mut gan = small_gan(&mut rng);
    let gen_before = weights(&gan.generator);
    let disc_before = weights(&gan.discriminator);
    let real = real_data(4, &mut rng);

    let loss = gan.train_discriminator(&real, &mut rng).unwrap();
    assert!(loss > 0.0 && loss.is_finite());
    assert_eq!(weights(&gan.generator), gen_before);
    assert_ne!(weights(&gan.discriminator), disc_before);
}

#[test]
fn train_step_needs_enough_rows() {
    let mut rng = StdRandom::seeded(1);
    let mut gan = small_gan(&mut rng);
    let data = real_data(3, &mut rng);
    assert!(matches!(
        gan.train_step(&data, 8, &mut rng),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        gan.train_step(&data, 1, &mut rng),
        Err(Error::InvalidRange(_))
    ));
    let (d, g) = gan.train_step(&data, 4, &mut rng).unwrap();
    assert!(d.is_finite() && g.is_finite());
}

#[test]
fn train_epoch_runs_ceil_steps() {
    let mut rng = StdRandom::seeded(23);
    let mut gan = small_gan(&mut rng);
    let mut data = real_data(10, &mut rng);
    let mut history = LossHistory::new();
    let (d, g) = gan
        .train_epoch(&mut data, 4, 2, &mut rng, &mut [&mut history])
        .unwrap();
    assert!(d.is_finite() && g.is_finite());
    let steps: Vec<(usize, usize)> = history.gan_steps.iter().map(|s| (s.epoch, s.step)).collect();
    assert_eq!(steps, vec![(2, 1), (2, 2), (2, 3)]);
}

#[test]
fn generate_shapes_and_range() {
    let mut rng = StdRandom::seeded(8);
    let mut gan = small_gan(&mut rng);
    let samples = gan.generate(7, &mut rng).unwrap();
    assert_eq!((samples.rows(), samples.cols()), (7, FEATURES));
    assert!(samples.data().iter().all(|v| v.abs() <= 1.0));
    assert!(Gan::new(
        Model::new(Adam::new(0.1).unwrap(), BinaryCrossEntropy::new()),
        Model::new(Adam::new(0.1).unwrap(), BinaryCrossEntropy::new()),
        0
    )
    .is_err());
}

#[test]
fn builders_lay_out_networks() {
    let mut rng = StdRandom::seeded(30);
    let g = build_generator(10, 12, Adam::new(2e-4).unwrap(), &mut rng).unwrap();
    let d = build_discriminator(12, Adam::new(2e-4).unwrap(), &mut rng).unwrap();
    let names: Vec<&str> = g.layers().iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["gen_1", "gen_2", "gen_3", "gen_out"]);
    assert_eq!(
        g.parameter_count(),
        10 * 256 + 256 * 512 + 512 * 1024 + 1024 * 12
    );
    assert_eq!(d.parameter_count(), 12 * 512 + 512 * 256 + 256);
    assert_eq!(d.layers().len(), 3);
}
