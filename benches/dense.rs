use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gannet::cost::MeanSquaredError;
use gannet::layers::{Activation, DenseLayer, Sigmoid};
use gannet::math::Matrix;
use gannet::model::Model;
use gannet::optim::Adam;
use gannet::rng::StdRandom;

fn sigmoid() -> Option<Box<dyn Activation>> {
    Some(Box::new(Sigmoid::new()))
}

fn bench_train_on_batch(c: &mut Criterion) {
    let mut rng = StdRandom::seeded(0);
    let mut model = Model::new(Adam::new(1e-3).unwrap(), MeanSquaredError::new());
    model.add(DenseLayer::new(784, 100, sigmoid(), &mut rng).unwrap());
    model.add(DenseLayer::new(100, 10, sigmoid(), &mut rng).unwrap());
    let x = Matrix::uniform(0.0, 1.0, 20, 784, &mut rng).unwrap();
    let y = Matrix::uniform(0.0, 1.0, 20, 10, &mut rng).unwrap();

    c.bench_function("dense_forward_784_100_10", |bencher| {
        bencher.iter(|| {
            let out = model.forward(black_box(&x)).unwrap();
            black_box(out);
        });
    });

    c.bench_function("dense_train_on_batch_784_100_10", |bencher| {
        bencher.iter(|| {
            let loss = model.train_on_batch(black_box(&x), black_box(&y)).unwrap();
            black_box(loss);
        });
    });
}

criterion_group!(benches, bench_train_on_batch);
criterion_main!(benches);
