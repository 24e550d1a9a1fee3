// Trains a network on the XOR truth table.
//
//   dualnet [SPEC.json] [ITERATIONS]
//
// Without a spec file the built-in 2-4-1 sigmoid network is used. Set
// RUST_LOG=dualnet=debug for lifecycle logging.

use std::env;
use std::process;

use log::{error, info};

use dualnet::{
    train_loop, CpuMatrix, Domain, LayerSpec, Matrix, NetworkSpec, Result, TrainConfig,
};

const DEFAULT_ITERATIONS: usize = 5000;

fn default_spec() -> NetworkSpec {
    NetworkSpec {
        name: "xor".into(),
        alpha: 1.0,
        accelerator: false,
        seed: Some(1),
        layers: vec![
            LayerSpec::Affine { units: Some(4) },
            LayerSpec::Sigmoid,
            LayerSpec::Affine { units: None },
            LayerSpec::Sigmoid,
            LayerSpec::MinSquare,
        ],
        device: None,
        print: None,
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);

    let spec = match args.next() {
        Some(path) => NetworkSpec::load_json(path)?,
        None => default_spec(),
    };
    let iterations = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_ITERATIONS);

    spec.configure_device()?;
    let domain = Domain::from_flag(spec.accelerator);

    let x = Matrix::Host(CpuMatrix::from_rows(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]])?)
        .to_domain(domain)?;
    let y = Matrix::Host(CpuMatrix::from_rows(&[[0.0], [1.0], [1.0], [0.0]])?).to_domain(domain)?;

    let mut network = spec.build();
    network.init(&x, &y, spec.accelerator)?;

    info!("training `{}` on the {domain} for {iterations} iterations", spec.name);
    let loss = train_loop(&mut network, &TrainConfig::new(iterations, iterations / 10))?;
    info!("final loss {loss:.6}");

    let inputs = x.to_host()?;
    let h = network.forward()?.to_host()?;
    for i in 0..h.rows() {
        println!("{:?} -> {:.4}", inputs.row(i)?, h.get(i, 0)?);
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        eprintln!("dualnet: {e}");
        process::exit(1);
    }
}
