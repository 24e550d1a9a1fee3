use dualnet::{
    Affine, CpuMatrix, CpuVector, Domain, Error, Layer, Matrix, MinSquare, MseLoss, NormalSampler,
    Sigmoid, Vector,
};

fn host(rows: &[&[f32]]) -> Matrix {
    Matrix::Host(CpuMatrix::from_rows(rows).unwrap())
}

fn random(rows: usize, cols: usize, sampler: &mut NormalSampler) -> Matrix {
    let mut m = CpuMatrix::zeros(rows, cols).unwrap();
    m.randn(sampler);
    Matrix::Host(m)
}

fn on(domain: Domain, m: &Matrix) -> Matrix {
    m.to_domain(domain).unwrap()
}

#[test]
fn sigmoid_output_is_bounded() {
    for domain in [Domain::Host, Domain::Accelerator] {
        let mut layer = Sigmoid::new();
        layer.set_dim(3, 3).unwrap();
        layer.use_accelerator(domain == Domain::Accelerator);
        layer.init(&mut NormalSampler::seeded(0)).unwrap();

        let x = on(domain, &host(&[&[-50.0, -1.0, 0.0], &[1.0, 10.0, 50.0]]));
        let fx = layer.forward(&x).unwrap().to_host().unwrap();
        assert!(fx.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(fx.get(0, 2).unwrap(), 0.5);
    }
}

#[test]
fn sigmoid_derivative_at_zero_is_a_quarter() {
    for domain in [Domain::Host, Domain::Accelerator] {
        let mut layer = Sigmoid::new();
        layer.set_dim(2, 2).unwrap();
        layer.use_accelerator(domain == Domain::Accelerator);
        layer.init(&mut NormalSampler::seeded(0)).unwrap();

        let x = on(domain, &host(&[&[0.0, 0.0], &[0.0, 0.0]]));
        let d_out = on(domain, &host(&[&[1.0, 2.0], &[-4.0, 8.0]]));

        layer.forward(&x).unwrap();
        let dx = layer.backward(&d_out).unwrap().to_host().unwrap();
        assert_eq!(dx.as_slice(), &[0.25, 0.5, -1.0, 2.0]);
    }
}

#[test]
fn sigmoid_rejects_wrong_gradient_shape() {
    let mut layer = Sigmoid::new();
    layer.set_dim(2, 2).unwrap();
    layer.init(&mut NormalSampler::seeded(0)).unwrap();
    layer.forward(&host(&[&[0.0, 0.0]])).unwrap();

    let bad = host(&[&[1.0, 1.0], &[1.0, 1.0]]);
    assert!(matches!(layer.backward(&bad), Err(Error::Dimension(_))));
}

#[test]
fn min_square_gradient_is_output_minus_target() {
    for domain in [Domain::Host, Domain::Accelerator] {
        let mut layer = MinSquare::new();
        layer.set_dim(2, 2).unwrap();
        layer.use_accelerator(domain == Domain::Accelerator);
        layer.init(&mut NormalSampler::seeded(0)).unwrap();

        let h = on(domain, &host(&[&[1.0, 2.0], &[3.0, 4.0]]));
        let y = on(domain, &host(&[&[0.5, 2.0], &[5.0, 1.0]]));

        let fx = layer.forward(&h).unwrap().to_host().unwrap();
        assert_eq!(fx, h.to_host().unwrap());

        let dx = layer.backward(&y).unwrap().to_host().unwrap();
        assert_eq!(dx.as_slice(), &[0.5, 0.0, -2.0, 3.0]);

        // (0.25 + 0 + 4 + 9) / (2 * 2)
        assert!((layer.loss(&y).unwrap() - 3.3125).abs() < 1e-6);
        assert_eq!(MseLoss::loss(&h, &h).unwrap(), 0.0);
        assert!(layer.is_loss());
    }
}

#[test]
fn affine_forward_is_xw_plus_b() {
    let mut layer = Affine::new();
    layer.set_dim(2, 1).unwrap();
    layer.init(&mut NormalSampler::seeded(9)).unwrap();
    layer.set_weights(&host(&[&[1.0], &[1.0]])).unwrap();
    layer
        .set_bias(&Vector::Host(CpuVector::from_slice(&[0.5]).unwrap()))
        .unwrap();

    let out = layer.forward(&host(&[&[1.0, 1.0], &[2.0, 2.0]])).unwrap();
    assert_eq!(out.to_host().unwrap().as_slice(), &[2.5, 4.5]);
}

#[test]
fn affine_rejects_misshapen_parameters() {
    let mut layer = Affine::new();
    layer.set_dim(2, 3).unwrap();
    layer.init(&mut NormalSampler::seeded(9)).unwrap();

    assert!(matches!(layer.set_weights(&host(&[&[1.0, 1.0]])), Err(Error::Dimension(_))));
    let bias = Vector::Host(CpuVector::zeros(2).unwrap());
    assert!(matches!(layer.set_bias(&bias), Err(Error::Dimension(_))));
    assert!(matches!(layer.forward(&host(&[&[1.0, 2.0, 3.0]])), Err(Error::Dimension(_))));
}

#[test]
fn affine_backward_before_forward_fails() {
    let mut layer = Affine::new();
    layer.set_dim(2, 2).unwrap();
    layer.init(&mut NormalSampler::seeded(9)).unwrap();
    let g = host(&[&[1.0, 1.0]]);
    assert!(matches!(layer.backward(&g), Err(Error::NullReference(_))));
}

#[test]
fn affine_gradient_matches_finite_differences() {
    let mut sampler = NormalSampler::seeded(11);
    let mut layer = Affine::new();
    layer.set_dim(3, 2).unwrap();
    layer.init(&mut sampler).unwrap();

    let batch = 4;
    let x = random(batch, 3, &mut sampler);
    let y = random(batch, 2, &mut sampler);

    let h = layer.forward(&x).unwrap();
    let grad = MseLoss::derivative(h, &y).unwrap();
    layer.backward(&grad).unwrap();

    let dw = layer.weight_grad().unwrap().to_host().unwrap();
    let w0 = layer.weights().unwrap().to_host().unwrap();
    let eps = 1e-2;

    for j in 0..3 {
        for k in 0..2 {
            let mut loss_at = |delta: f32| {
                let mut w = w0.clone();
                w.set(j, k, w0.get(j, k).unwrap() + delta).unwrap();
                layer.set_weights(&Matrix::Host(w)).unwrap();
                let h = layer.forward(&x).unwrap();
                MseLoss::loss(h, &y).unwrap()
            };
            let numeric = (loss_at(eps) - loss_at(-eps)) / (2.0 * eps);
            // the loss averages over the batch, the raw gradient does not
            let analytic = dw.get(j, k).unwrap() / batch as f32;

            assert!(
                (numeric - analytic).abs() < 1e-2 * (1.0 + analytic.abs()),
                "dW[{j},{k}]: numeric {numeric}, analytic {analytic}"
            );
        }
    }
}

#[test]
fn affine_device_gradients_match_host() {
    let mut sampler = NormalSampler::seeded(12);
    let x = random(5, 3, &mut sampler);
    let g = random(5, 2, &mut sampler);

    let mut results = Vec::new();
    for domain in [Domain::Host, Domain::Accelerator] {
        let mut layer = Affine::new();
        layer.set_dim(3, 2).unwrap();
        layer.use_accelerator(domain == Domain::Accelerator);
        layer.init(&mut NormalSampler::seeded(13)).unwrap();

        layer.forward(&on(domain, &x)).unwrap();
        let dx = layer.backward(&on(domain, &g)).unwrap().to_host().unwrap();
        let dw = layer.weight_grad().unwrap().to_host().unwrap();
        let db = layer.bias_grad().unwrap().to_host().unwrap();

        layer.update(0.5).unwrap();
        let w = layer.weights().unwrap().to_host().unwrap();
        results.push((dx, dw, db, w));
    }

    let (host, device) = (&results[0], &results[1]);
    let close = |a: &[f32], b: &[f32]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4);
    assert!(close(host.0.as_slice(), device.0.as_slice()));
    assert!(close(host.1.as_slice(), device.1.as_slice()));
    assert!(close(host.2.as_slice(), device.2.as_slice()));
    assert!(close(host.3.as_slice(), device.3.as_slice()));
}

#[test]
fn affine_update_scales_by_batch() {
    let mut layer = Affine::new();
    layer.set_dim(1, 1).unwrap();
    layer.init(&mut NormalSampler::seeded(1)).unwrap();
    layer.set_weights(&host(&[&[0.0]])).unwrap();
    layer
        .set_bias(&Vector::Host(CpuVector::from_slice(&[0.0]).unwrap()))
        .unwrap();

    layer.forward(&host(&[&[1.0], &[3.0]])).unwrap();
    layer.backward(&host(&[&[1.0], &[1.0]])).unwrap();
    // dW = 1 + 3, db = 2; step = 0.5 / 2
    layer.update(0.5).unwrap();

    assert_eq!(layer.weights().unwrap().to_host().unwrap().as_slice(), &[-1.0]);
    assert_eq!(layer.bias().unwrap().to_host().unwrap().as_slice(), &[-0.5]);
}

#[test]
fn host_layer_rejects_device_input() {
    let mut layer = Sigmoid::new();
    layer.set_dim(1, 1).unwrap();
    layer.init(&mut NormalSampler::seeded(0)).unwrap();
    let x = on(Domain::Accelerator, &host(&[&[0.0]]));
    assert!(matches!(layer.forward(&x), Err(Error::Cast { .. })));
}
