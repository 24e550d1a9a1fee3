use dualnet::{Affine, CpuMatrix, Matrix, MinSquare, Network, NormalSampler, Sigmoid};

fn main() -> dualnet::Result<()> {
    let x = Matrix::Host(CpuMatrix::from_rows(&[
        [1.0, 0.0],
        [1.0, 1.0],
        [0.0, 1.0],
        [0.0, 0.0],
    ])?);
    let y = Matrix::Host(CpuMatrix::from_rows(&[[1.0], [0.0], [1.0], [0.0]])?);

    let mut network = Network::new();
    network <<= Affine::with_units(4);
    network <<= Sigmoid::new();
    network <<= Affine::new();
    network <<= Sigmoid::new();
    network <<= MinSquare::new();

    network.set_alpha(1.0);
    network.set_sampler(NormalSampler::seeded(7));
    network.init(&x, &y, false)?;

    let iterations = 10000;
    for i in 0..iterations {
        network.train(1)?;
        if i % 1000 == 0 {
            println!("Iteration {i}: loss = {:.6}", network.min_square_error()?);
        }
    }

    let h = network.forward()?.to_host()?;
    let inputs = x.to_host()?;
    for i in 0..h.rows() {
        println!("Input: {:?} -> Output: {:.4}", inputs.row(i)?, h.get(i, 0)?);
    }
    Ok(())
}
