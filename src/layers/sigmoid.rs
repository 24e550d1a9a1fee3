use super::layer::{Layer, LayerCore};
use crate::device;
use crate::error::{Error, Result};
use crate::math::{Matrix, NormalSampler};

/// Elementwise logistic activation, `fx = 1 / (1 + e^-x)`.
///
/// The derivative is taken from the cached output as `fx · (1 - fx)`.
#[derive(Debug, Default)]
pub struct Sigmoid {
    core: LayerCore,
}

impl Sigmoid {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Layer for Sigmoid {
    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn set_dim(&mut self, input: usize, output: usize) -> Result<()> {
        if input != output {
            return Err(Error::dims("sigmoid output width", input, output));
        }
        self.core.set_dim(input, output)
    }

    fn init(&mut self, _sampler: &mut NormalSampler) -> Result<()> {
        self.core.release();
        Ok(())
    }

    fn forward(&mut self, x: &Matrix) -> Result<&Matrix> {
        self.core.check_input(x, self.core.input, "sigmoid input width")?;
        let fx = self.core.init_fx(x.rows(), x.cols())?;

        match x {
            Matrix::Host(x) => {
                let fx = fx.as_host_mut()?;
                fx.as_mut_slice()
                    .iter_mut()
                    .zip(x.as_slice())
                    .for_each(|(y, &z)| *y = sigmoid(z));
            }
            Matrix::Accelerator(x) => {
                let fx = fx.as_accelerator_mut()?;
                device::get()?.sigmoid_fx(x.buffer(), fx.buffer_mut())?;
            }
        }

        self.core.fx()
    }

    fn backward(&mut self, d_out: &Matrix) -> Result<&Matrix> {
        let (fx, dx) = self.core.fx_and_dx()?;
        if d_out.shape() != fx.shape() {
            return Err(Error::dims(
                "sigmoid output gradient",
                format!("{}x{}", fx.rows(), fx.cols()),
                format!("{}x{}", d_out.rows(), d_out.cols()),
            ));
        }

        match (fx, dx) {
            (Matrix::Host(fx), Matrix::Host(dx)) => {
                let g = d_out.as_host()?;
                for ((d, &s), &g) in dx
                    .as_mut_slice()
                    .iter_mut()
                    .zip(fx.as_slice())
                    .zip(g.as_slice())
                {
                    *d = s * (1.0 - s) * g;
                }
            }
            (Matrix::Accelerator(fx), Matrix::Accelerator(dx)) => {
                let g = d_out.as_accelerator()?;
                let dev = device::get()?;
                dev.sigmoid_dx(fx.buffer(), dx.buffer_mut())?;
                dx.mul_inplace(g)?;
            }
            (fx, dx) => {
                return Err(Error::Cast {
                    expected: fx.domain(),
                    actual: dx.domain(),
                })
            }
        }

        self.core.dx()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::CpuMatrix;

    #[test]
    fn rejects_non_square_dimensions() {
        let mut layer = Sigmoid::new();
        assert!(matches!(layer.set_dim(2, 3), Err(Error::Dimension(_))));
        assert!(layer.set_dim(3, 3).is_ok());
    }

    #[test]
    fn backward_before_forward_is_a_null_reference() {
        let mut layer = Sigmoid::new();
        layer.set_dim(1, 1).unwrap();
        let g = Matrix::Host(CpuMatrix::filled(1, 1, 1.0).unwrap());
        assert!(matches!(layer.backward(&g), Err(Error::NullReference(_))));
    }
}
