//! Narrowing a domain-tagged tensor to its concrete storage type.
//!
//! These are the only ways to get at a [`CpuMatrix`] or [`GpuMatrix`] inside a
//! [`Matrix`] (and likewise for vectors). Nothing here converts between
//! domains: asking for the wrong one is a [`Error::Cast`].

use super::cpu_matrix::CpuMatrix;
use super::cpu_vector::CpuVector;
use super::gpu_matrix::GpuMatrix;
use super::gpu_vector::GpuVector;
use super::tensor::{Domain, Matrix, Vector};
use crate::error::{Error, Result};

/// A tensor with one concrete type per storage domain.
pub trait Dispatch {
    type Host;
    type Device;

    /// Name used when an absent handle is reported.
    const KIND: &'static str;

    fn domain(&self) -> Domain;
    fn host(&self) -> Option<&Self::Host>;
    fn host_mut(&mut self) -> Option<&mut Self::Host>;
    fn device(&self) -> Option<&Self::Device>;
    fn device_mut(&mut self) -> Option<&mut Self::Device>;
}

impl Dispatch for Matrix {
    type Host = CpuMatrix;
    type Device = GpuMatrix;

    const KIND: &'static str = "matrix";

    fn domain(&self) -> Domain {
        Matrix::domain(self)
    }

    fn host(&self) -> Option<&CpuMatrix> {
        match self {
            Matrix::Host(m) => Some(m),
            Matrix::Accelerator(_) => None,
        }
    }

    fn host_mut(&mut self) -> Option<&mut CpuMatrix> {
        match self {
            Matrix::Host(m) => Some(m),
            Matrix::Accelerator(_) => None,
        }
    }

    fn device(&self) -> Option<&GpuMatrix> {
        match self {
            Matrix::Accelerator(m) => Some(m),
            Matrix::Host(_) => None,
        }
    }

    fn device_mut(&mut self) -> Option<&mut GpuMatrix> {
        match self {
            Matrix::Accelerator(m) => Some(m),
            Matrix::Host(_) => None,
        }
    }
}

impl Dispatch for Vector {
    type Host = CpuVector;
    type Device = GpuVector;

    const KIND: &'static str = "vector";

    fn domain(&self) -> Domain {
        Vector::domain(self)
    }

    fn host(&self) -> Option<&CpuVector> {
        match self {
            Vector::Host(v) => Some(v),
            Vector::Accelerator(_) => None,
        }
    }

    fn host_mut(&mut self) -> Option<&mut CpuVector> {
        match self {
            Vector::Host(v) => Some(v),
            Vector::Accelerator(_) => None,
        }
    }

    fn device(&self) -> Option<&GpuVector> {
        match self {
            Vector::Accelerator(v) => Some(v),
            Vector::Host(_) => None,
        }
    }

    fn device_mut(&mut self) -> Option<&mut GpuVector> {
        match self {
            Vector::Accelerator(v) => Some(v),
            Vector::Host(_) => None,
        }
    }
}

fn cast_error<T: Dispatch + ?Sized>(tensor: &T, expected: Domain) -> Error {
    Error::Cast {
        expected,
        actual: tensor.domain(),
    }
}

/// Narrows to the host type.
pub fn as_host<T: Dispatch>(tensor: Option<&T>) -> Result<&T::Host> {
    let tensor = tensor.ok_or(Error::NullReference(T::KIND))?;
    tensor
        .host()
        .ok_or_else(|| cast_error(tensor, Domain::Host))
}

pub fn as_host_mut<T: Dispatch>(tensor: Option<&mut T>) -> Result<&mut T::Host> {
    let tensor = tensor.ok_or(Error::NullReference(T::KIND))?;
    let actual = tensor.domain();
    tensor.host_mut().ok_or(Error::Cast {
        expected: Domain::Host,
        actual,
    })
}

/// Narrows to the accelerator type.
pub fn as_accelerator<T: Dispatch>(tensor: Option<&T>) -> Result<&T::Device> {
    let tensor = tensor.ok_or(Error::NullReference(T::KIND))?;
    tensor
        .device()
        .ok_or_else(|| cast_error(tensor, Domain::Accelerator))
}

pub fn as_accelerator_mut<T: Dispatch>(tensor: Option<&mut T>) -> Result<&mut T::Device> {
    let tensor = tensor.ok_or(Error::NullReference(T::KIND))?;
    let actual = tensor.domain();
    tensor.device_mut().ok_or(Error::Cast {
        expected: Domain::Accelerator,
        actual,
    })
}

pub fn is_host<T: Dispatch>(tensor: &T) -> bool {
    tensor.domain() == Domain::Host
}

pub fn is_accelerator<T: Dispatch>(tensor: &T) -> bool {
    tensor.domain() == Domain::Accelerator
}

impl Matrix {
    pub fn as_host(&self) -> Result<&CpuMatrix> {
        as_host(Some(self))
    }

    pub fn as_host_mut(&mut self) -> Result<&mut CpuMatrix> {
        as_host_mut(Some(self))
    }

    pub fn as_accelerator(&self) -> Result<&GpuMatrix> {
        as_accelerator(Some(self))
    }

    pub fn as_accelerator_mut(&mut self) -> Result<&mut GpuMatrix> {
        as_accelerator_mut(Some(self))
    }
}

impl Vector {
    pub fn as_host(&self) -> Result<&CpuVector> {
        as_host(Some(self))
    }

    pub fn as_host_mut(&mut self) -> Result<&mut CpuVector> {
        as_host_mut(Some(self))
    }

    pub fn as_accelerator(&self) -> Result<&GpuVector> {
        as_accelerator(Some(self))
    }

    pub fn as_accelerator_mut(&mut self) -> Result<&mut GpuVector> {
        as_accelerator_mut(Some(self))
    }
}
