use std::fmt;

use serde::{Deserialize, Serialize};

use super::cpu_matrix::CpuMatrix;
use super::cpu_vector::CpuVector;
use super::gpu_matrix::GpuMatrix;
use super::gpu_vector::GpuVector;
use super::random::NormalSampler;
use crate::error::{Error, Result};

/// Where a tensor's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Host,
    Accelerator,
}

impl Domain {
    pub fn from_flag(accelerator: bool) -> Domain {
        if accelerator {
            Domain::Accelerator
        } else {
            Domain::Host
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Host => write!(f, "host"),
            Domain::Accelerator => write!(f, "accelerator"),
        }
    }
}

/// A matrix in either storage domain.
///
/// The domain is fixed when the value is built; moving between domains always
/// goes through an explicit copy such as [`Matrix::to_domain`].
#[derive(Debug)]
pub enum Matrix {
    Host(CpuMatrix),
    Accelerator(GpuMatrix),
}

/// A vector in either storage domain.
#[derive(Debug)]
pub enum Vector {
    Host(CpuVector),
    Accelerator(GpuVector),
}

fn mismatch(expected: Domain, actual: Domain) -> Error {
    Error::Cast { expected, actual }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize, domain: Domain) -> Result<Matrix> {
        Ok(match domain {
            Domain::Host => Matrix::Host(CpuMatrix::zeros(rows, cols)?),
            Domain::Accelerator => Matrix::Accelerator(GpuMatrix::zeros(rows, cols)?),
        })
    }

    pub fn domain(&self) -> Domain {
        match self {
            Matrix::Host(_) => Domain::Host,
            Matrix::Accelerator(_) => Domain::Accelerator,
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Matrix::Host(m) => m.rows(),
            Matrix::Accelerator(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Matrix::Host(m) => m.cols(),
            Matrix::Accelerator(m) => m.cols(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn try_clone(&self) -> Result<Matrix> {
        Ok(match self {
            Matrix::Host(m) => Matrix::Host(m.clone()),
            Matrix::Accelerator(m) => Matrix::Accelerator(m.try_clone()?),
        })
    }

    /// A host copy, whatever the domain.
    pub fn to_host(&self) -> Result<CpuMatrix> {
        match self {
            Matrix::Host(m) => Ok(m.clone()),
            Matrix::Accelerator(m) => m.to_host(),
        }
    }

    /// A copy living in `domain`.
    pub fn to_domain(&self, domain: Domain) -> Result<Matrix> {
        Ok(match (self, domain) {
            (Matrix::Host(m), Domain::Accelerator) => Matrix::Accelerator(GpuMatrix::from_host(m)?),
            (Matrix::Accelerator(m), Domain::Host) => Matrix::Host(m.to_host()?),
            _ => self.try_clone()?,
        })
    }

    pub fn sum(&self) -> Result<f32> {
        match self {
            Matrix::Host(m) => Ok(m.sum()),
            Matrix::Accelerator(m) => m.sum(),
        }
    }

    /// `self += alpha * x`. Both operands must share a domain.
    pub fn axpy(&mut self, alpha: f32, x: &Matrix) -> Result<()> {
        match (self, x) {
            (Matrix::Host(a), Matrix::Host(b)) => a.axpy(alpha, b),
            (Matrix::Accelerator(a), Matrix::Accelerator(b)) => a.axpy(alpha, b),
            (a, b) => Err(mismatch(a.domain(), b.domain())),
        }
    }

    /// Same-shape, same-domain copy.
    pub fn copy_from(&mut self, other: &Matrix) -> Result<()> {
        match (self, other) {
            (Matrix::Host(a), Matrix::Host(b)) => a.copy_from(b),
            (Matrix::Accelerator(a), Matrix::Accelerator(b)) => a.copy_from(b),
            (a, b) => Err(mismatch(a.domain(), b.domain())),
        }
    }

    pub fn clear(&mut self) -> Result<()> {
        match self {
            Matrix::Host(m) => {
                m.clear();
                Ok(())
            }
            Matrix::Accelerator(m) => m.clear(),
        }
    }

    pub fn randn(&mut self, sampler: &mut NormalSampler) -> Result<()> {
        match self {
            Matrix::Host(m) => {
                m.randn(sampler);
                Ok(())
            }
            Matrix::Accelerator(m) => m.randn(sampler),
        }
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

impl Vector {
    pub fn zeros(len: usize, domain: Domain) -> Result<Vector> {
        Ok(match domain {
            Domain::Host => Vector::Host(CpuVector::zeros(len)?),
            Domain::Accelerator => Vector::Accelerator(GpuVector::zeros(len)?),
        })
    }

    pub fn domain(&self) -> Domain {
        match self {
            Vector::Host(_) => Domain::Host,
            Vector::Accelerator(_) => Domain::Accelerator,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Vector::Host(v) => v.len(),
            Vector::Accelerator(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn try_clone(&self) -> Result<Vector> {
        Ok(match self {
            Vector::Host(v) => Vector::Host(v.clone()),
            Vector::Accelerator(v) => Vector::Accelerator(v.try_clone()?),
        })
    }

    pub fn to_host(&self) -> Result<CpuVector> {
        match self {
            Vector::Host(v) => Ok(v.clone()),
            Vector::Accelerator(v) => v.to_host(),
        }
    }

    pub fn to_domain(&self, domain: Domain) -> Result<Vector> {
        Ok(match (self, domain) {
            (Vector::Host(v), Domain::Accelerator) => Vector::Accelerator(GpuVector::from_host(v)?),
            (Vector::Accelerator(v), Domain::Host) => Vector::Host(v.to_host()?),
            _ => self.try_clone()?,
        })
    }

    pub fn axpy(&mut self, alpha: f32, x: &Vector) -> Result<()> {
        match (self, x) {
            (Vector::Host(a), Vector::Host(b)) => a.axpy(alpha, b),
            (Vector::Accelerator(a), Vector::Accelerator(b)) => a.axpy(alpha, b),
            (a, b) => Err(mismatch(a.domain(), b.domain())),
        }
    }

    pub fn copy_from(&mut self, other: &Vector) -> Result<()> {
        match (self, other) {
            (Vector::Host(a), Vector::Host(b)) => a.copy_from(b),
            (Vector::Accelerator(a), Vector::Accelerator(b)) => a.copy_from(b),
            (a, b) => Err(mismatch(a.domain(), b.domain())),
        }
    }

    pub fn randn(&mut self, sampler: &mut NormalSampler) -> Result<()> {
        match self {
            Vector::Host(v) => {
                v.randn(sampler);
                Ok(())
            }
            Vector::Accelerator(v) => v.randn(sampler),
        }
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

impl From<CpuMatrix> for Matrix {
    fn from(m: CpuMatrix) -> Self {
        Matrix::Host(m)
    }
}

impl From<GpuMatrix> for Matrix {
    fn from(m: GpuMatrix) -> Self {
        Matrix::Accelerator(m)
    }
}

impl From<CpuVector> for Vector {
    fn from(v: CpuVector) -> Self {
        Vector::Host(v)
    }
}

impl From<GpuVector> for Vector {
    fn from(v: GpuVector) -> Self {
        Vector::Accelerator(v)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matrix::Host(m) => fmt::Display::fmt(m, f),
            Matrix::Accelerator(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vector::Host(v) => fmt::Display::fmt(v, f),
            Vector::Accelerator(v) => fmt::Display::fmt(v, f),
        }
    }
}
