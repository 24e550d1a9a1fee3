use std::sync::atomic::Ordering;
use std::time::Instant;

use log::{debug, info};

use crate::error::Result;
use crate::network::network::Network;
use crate::train::iteration_stats::IterationStats;
use crate::train::train_config::TrainConfig;

/// Trains an initialized `network` for `config.iterations` rounds and returns
/// the loss at the **last report point**.
///
/// The loss is evaluated every `config.report_every` iterations and after the
/// final one. With no iterations at all, the current loss is returned.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
pub fn train_loop(network: &mut Network<'_>, config: &TrainConfig) -> Result<f32> {
    let t_start = Instant::now();
    let mut last_loss = network.min_square_error()?;

    debug!(
        "training for {} iterations at alpha = {}, initial loss {last_loss:.6}",
        config.iterations,
        network.get_alpha()
    );

    for iteration in 1..=config.iterations {
        if stop_requested(config) {
            info!("training stopped before iteration {iteration}");
            break;
        }

        network.step()?;

        let report = iteration == config.iterations
            || (config.report_every > 0 && iteration % config.report_every == 0);
        if !report {
            continue;
        }

        // ── Evaluate and emit progress ────────────────────────────────────
        let loss = network.min_square_error()?;
        last_loss = loss;

        let stats = IterationStats {
            iteration,
            total_iterations: config.iterations,
            loss,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!("iteration {iteration}/{}: loss {loss:.6}", config.iterations);

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last_loss)
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .map(|flag| flag.load(Ordering::Relaxed))
        .unwrap_or(false)
}
