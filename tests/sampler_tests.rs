// The process-wide sampler is shared state, so its reseeding is checked in a
// test binary of its own.

use dualnet::math::random::{randn, seed_global};
use dualnet::{Affine, CpuMatrix, Matrix, Network, Sigmoid};

fn host<R: AsRef<[f32]>>(rows: &[R]) -> Matrix {
    Matrix::Host(CpuMatrix::from_rows(rows).unwrap())
}

#[test]
fn reseeding_the_global_sampler_reproduces_draws_and_networks() {
    seed_global(9);
    let first: Vec<f32> = (0..5).map(|_| randn()).collect();
    seed_global(9);
    let again: Vec<f32> = (0..5).map(|_| randn()).collect();
    assert_eq!(first, again);

    let x = host(&[[0.0, 1.0], [1.0, 0.0]]);
    let y = host(&[[1.0], [1.0]]);

    let mut outputs = Vec::new();
    for _ in 0..2 {
        seed_global(4);
        let mut network = Network::new();
        network <<= Affine::with_units(3);
        network <<= Sigmoid::new();
        network <<= Affine::new();
        network.init(&x, &y, false).unwrap();
        outputs.push(network.forward().unwrap().to_host().unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}
