use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};

use dualnet::{
    train_loop, Affine, CpuMatrix, CpuVector, Domain, Error, Layer, LayerSpec, Matrix, MinSquare,
    MseLoss, Network, NetworkSpec, NormalSampler, Sigmoid, TrainConfig, Vector,
};

fn host<R: AsRef<[f32]>>(rows: &[R]) -> Matrix {
    Matrix::Host(CpuMatrix::from_rows(rows).unwrap())
}

fn xor() -> (Matrix, Matrix) {
    (
        host(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]),
        host(&[[0.0], [1.0], [1.0], [0.0]]),
    )
}

fn xor_network<'a>(seed: u64) -> Network<'a> {
    let mut network = Network::new();
    network <<= Affine::with_units(4);
    network <<= Sigmoid::new();
    network <<= Affine::new();
    network <<= Sigmoid::new();
    network <<= MinSquare::new();
    network.set_alpha(1.0);
    network.set_sampler(NormalSampler::seeded(seed));
    network
}

#[test]
fn fixed_single_layer_network_has_zero_error() {
    let x = host(&[[1.0, 1.0], [2.0, 2.0]]);
    let y = host(&[[2.0], [4.0]]);

    let mut network = Network::new();
    network <<= Affine::new();
    network.init(&x, &y, false).unwrap();

    let layer = network.layer_mut(0).unwrap();
    layer.set_weights(&host(&[[1.0], [1.0]])).unwrap();
    layer
        .set_bias(&Vector::Host(CpuVector::from_slice(&[0.0]).unwrap()))
        .unwrap();

    network.train(0).unwrap();
    assert_eq!(network.min_square_error().unwrap(), 0.0);
}

#[test]
fn dimensions_are_chained_through_the_stack() {
    let (x, y) = xor();
    let mut network = Network::new();
    network <<= Affine::with_units(3);
    network <<= Sigmoid::new();
    network <<= Affine::new();
    network <<= MinSquare::new();
    network.init(&x, &y, false).unwrap();

    let dims: Vec<_> = (0..network.len())
        .map(|i| network.layer(i).unwrap().dims())
        .collect();
    assert_eq!(dims, vec![(2, 3), (3, 3), (3, 1), (1, 1)]);
}

#[test]
fn hidden_projections_default_to_input_width() {
    let x = host(&[[0.0, 0.0, 0.0]]);
    let y = host(&[[0.0]]);
    let mut network = Network::new();
    network <<= Affine::new();
    network <<= Affine::new();
    network.init(&x, &y, false).unwrap();

    assert_eq!(network.layer(0).unwrap().dims(), (3, 3));
    assert_eq!(network.layer(1).unwrap().dims(), (3, 1));
}

#[test]
fn mismatched_final_width_is_rejected() {
    let (x, y) = xor();
    let mut network = Network::new();
    network <<= Affine::with_units(3);
    network <<= MinSquare::new();
    assert!(matches!(network.init(&x, &y, false), Err(Error::Network(_))));
}

#[test]
fn loss_layer_must_terminate_the_stack() {
    let x = host(&[[0.5, -1.0], [2.0, 0.0]]);
    let y = host(&[[1.0], [0.0]]);
    let mut network = Network::new();
    network <<= MinSquare::new();
    network <<= Affine::new();
    assert!(matches!(network.init(&x, &y, false), Err(Error::Network(_))));
    assert!(matches!(network.backward(), Err(Error::Network(_))));
}

#[test]
fn empty_network_cannot_be_initialized() {
    let (x, y) = xor();
    let mut network = Network::new();
    assert!(matches!(network.init(&x, &y, false), Err(Error::Network(_))));
}

#[test]
fn accelerator_training_requires_device_data() {
    let (x, y) = xor();
    let mut network = xor_network(1);
    assert!(matches!(
        network.init(&x, &y, true),
        Err(Error::Cast {
            expected: Domain::Accelerator,
            actual: Domain::Host
        })
    ));
}

#[test]
fn uninitialized_network_reports_an_error() {
    let mut network = xor_network(1);
    assert!(matches!(network.forward(), Err(Error::Network(_))));
    assert!(matches!(network.min_square_error(), Err(Error::Network(_))));
}

#[test]
fn training_reduces_the_error() {
    let (x, y) = xor();
    let mut network = xor_network(3);
    network.init(&x, &y, false).unwrap();

    let before = network.min_square_error().unwrap();
    network.train(2000).unwrap();
    let after = network.min_square_error().unwrap();

    assert!(after < before, "loss went from {before} to {after}");
}

#[test]
fn network_without_loss_layer_still_trains() {
    let (x, y) = xor();
    let mut network = Network::new();
    network <<= Affine::new();
    network.set_sampler(NormalSampler::seeded(5));
    network.init(&x, &y, false).unwrap();

    let before = network.min_square_error().unwrap();
    network.train(50).unwrap();
    assert!(network.min_square_error().unwrap() < before);
}

#[test]
fn error_after_training_reflects_updated_parameters() {
    let (x, y) = xor();
    let mut network = xor_network(3);
    network.init(&x, &y, false).unwrap();

    network.train(5).unwrap();
    let reported = network.min_square_error().unwrap();

    let h = network.forward().unwrap();
    let fresh = MseLoss::loss(h, &y).unwrap();
    assert_eq!(reported, fresh);
    assert_eq!(network.min_square_error().unwrap(), fresh);
}

#[test]
fn host_and_accelerator_training_agree() {
    let (hx, hy) = xor();
    let dx = hx.to_domain(Domain::Accelerator).unwrap();
    let dy = hy.to_domain(Domain::Accelerator).unwrap();

    let mut on_host = xor_network(7);
    on_host.init(&hx, &hy, false).unwrap();
    on_host.train(100).unwrap();

    let mut on_device = xor_network(7);
    on_device.init(&dx, &dy, true).unwrap();
    on_device.train(100).unwrap();

    let a = on_host.forward().unwrap().to_host().unwrap();
    let b = on_device.forward().unwrap().to_host().unwrap();
    assert!(a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .all(|(p, q)| (p - q).abs() < 1e-3));
}

#[test]
fn train_loop_reports_progress() {
    let (x, y) = xor();
    let mut network = xor_network(9);
    network.init(&x, &y, false).unwrap();

    let (tx, rx) = mpsc::channel();
    let config = TrainConfig {
        iterations: 10,
        report_every: 4,
        progress_tx: Some(tx),
        stop_flag: None,
    };

    let loss = train_loop(&mut network, &config).unwrap();
    drop(config);

    let reports: Vec<_> = rx.iter().collect();
    let iterations: Vec<_> = reports.iter().map(|s| s.iteration).collect();
    assert_eq!(iterations, vec![4, 8, 10]);
    assert!(reports.iter().all(|s| s.total_iterations == 10));
    assert_eq!(reports.last().unwrap().loss, loss);
}

#[test]
fn train_loop_honours_the_stop_flag() {
    let (x, y) = xor();
    let mut network = xor_network(9);
    network.init(&x, &y, false).unwrap();

    let (tx, rx) = mpsc::channel();
    let config = TrainConfig {
        iterations: 100,
        report_every: 1,
        progress_tx: Some(tx),
        stop_flag: Some(Arc::new(AtomicBool::new(true))),
    };

    let initial = network.min_square_error().unwrap();
    let loss = train_loop(&mut network, &config).unwrap();
    drop(config);

    assert_eq!(loss, initial);
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn spec_builds_a_trainable_network() {
    let spec = NetworkSpec {
        name: "xor".into(),
        alpha: 1.0,
        accelerator: false,
        seed: Some(21),
        layers: vec![
            LayerSpec::Affine { units: Some(4) },
            LayerSpec::Sigmoid,
            LayerSpec::Affine { units: None },
            LayerSpec::MinSquare,
        ],
        device: None,
        print: None,
    };

    let (x, y) = xor();
    let mut network = spec.build();
    network.init(&x, &y, spec.accelerator).unwrap();
    assert_eq!(network.get_alpha(), 1.0);

    let before = network.min_square_error().unwrap();
    let after = train_loop(&mut network, &TrainConfig::new(500, 0)).unwrap();
    assert!(after < before);
}
