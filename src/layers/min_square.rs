use super::layer::{Layer, LayerCore};
use crate::error::{Error, Result};
use crate::loss::MseLoss;
use crate::math::{Matrix, NormalSampler};

/// Terminal squared-error loss.
///
/// Forward passes its input through unchanged. Backward takes the target `y`
/// in place of an upstream gradient and returns `fx - y`.
#[derive(Debug, Default)]
pub struct MinSquare {
    core: LayerCore,
}

impl MinSquare {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loss of the cached output against `y`.
    pub fn loss(&self, y: &Matrix) -> Result<f32> {
        MseLoss::loss(self.core.fx()?, y)
    }
}

impl Layer for MinSquare {
    fn name(&self) -> &'static str {
        "MinSquare"
    }

    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn set_dim(&mut self, input: usize, output: usize) -> Result<()> {
        if input != output {
            return Err(Error::dims("loss output width", input, output));
        }
        self.core.set_dim(input, output)
    }

    fn init(&mut self, _sampler: &mut NormalSampler) -> Result<()> {
        self.core.release();
        Ok(())
    }

    fn forward(&mut self, x: &Matrix) -> Result<&Matrix> {
        self.core.check_input(x, self.core.input, "loss input width")?;
        self.core.init_fx(x.rows(), x.cols())?.copy_from(x)?;
        self.core.fx()
    }

    fn backward(&mut self, y: &Matrix) -> Result<&Matrix> {
        let (fx, dx) = self.core.fx_and_dx()?;
        if y.shape() != fx.shape() {
            return Err(Error::dims(
                "loss target",
                format!("{}x{}", fx.rows(), fx.cols()),
                format!("{}x{}", y.rows(), y.cols()),
            ));
        }

        dx.copy_from(fx)?;
        dx.axpy(-1.0, y)?;
        self.core.dx()
    }

    fn is_loss(&self) -> bool {
        true
    }
}
