use crate::error::{Error, Result};
use crate::math::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Scalar loss: sum((h - y)²) / (2 · batch)
    pub fn loss(h: &Matrix, y: &Matrix) -> Result<f32> {
        check_shapes(h, y)?;
        let batch = h.rows() as f32;

        let total = match (h, y) {
            (Matrix::Host(h), Matrix::Host(y)) => h
                .as_slice()
                .iter()
                .zip(y.as_slice())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>(),
            (Matrix::Accelerator(h), Matrix::Accelerator(y)) => {
                let mut diff = (h - y)?;
                diff.pow_inplace(2.0)?;
                diff.sum()?
            }
            (h, y) => {
                return Err(Error::Cast {
                    expected: h.domain(),
                    actual: y.domain(),
                })
            }
        };

        Ok(total / (2.0 * batch))
    }

    /// Gradient with respect to `h`: h - y
    pub fn derivative(h: &Matrix, y: &Matrix) -> Result<Matrix> {
        check_shapes(h, y)?;
        let mut grad = h.try_clone()?;
        grad.axpy(-1.0, y)?;
        Ok(grad)
    }
}

fn check_shapes(h: &Matrix, y: &Matrix) -> Result<()> {
    if h.shape() != y.shape() {
        return Err(Error::dims(
            "loss target",
            format!("{}x{}", h.rows(), h.cols()),
            format!("{}x{}", y.rows(), y.cols()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{CpuMatrix, GpuMatrix};

    #[test]
    fn loss_is_half_mean_squared_error_over_the_batch() {
        let h = Matrix::Host(CpuMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap());
        let y = Matrix::Host(CpuMatrix::from_rows(&[[0.0, 2.0], [3.0, 2.0]]).unwrap());
        // (1 + 0 + 0 + 4) / (2 * 2)
        assert_eq!(MseLoss::loss(&h, &y).unwrap(), 1.25);
        assert_eq!(MseLoss::loss(&h, &h).unwrap(), 0.0);
    }

    #[test]
    fn device_loss_matches_host_loss() {
        let h = CpuMatrix::from_rows(&[[0.5, -1.0], [2.0, 0.0]]).unwrap();
        let y = CpuMatrix::from_rows(&[[0.0, 1.0], [1.0, 1.0]]).unwrap();

        let host = MseLoss::loss(&Matrix::Host(h.clone()), &Matrix::Host(y.clone())).unwrap();
        let dev = MseLoss::loss(
            &Matrix::Accelerator(GpuMatrix::from_host(&h).unwrap()),
            &Matrix::Accelerator(GpuMatrix::from_host(&y).unwrap()),
        )
        .unwrap();
        assert!((host - dev).abs() < 1e-6);
    }

    #[test]
    fn mixed_domains_are_rejected() {
        let h = Matrix::Host(CpuMatrix::zeros(1, 1).unwrap());
        let y = Matrix::Accelerator(GpuMatrix::zeros(1, 1).unwrap());
        assert!(matches!(MseLoss::loss(&h, &y), Err(Error::Cast { .. })));
    }
}
