use std::fmt;

use super::cpu_vector::CpuVector;
use super::print;
use super::random::NormalSampler;
use crate::device::{self, DeviceBuffer};
use crate::error::{Error, Result};

/// A dense vector resident in accelerator memory.
#[derive(Debug)]
pub struct GpuVector {
    pub(super) buf: DeviceBuffer,
}

impl GpuVector {
    pub fn zeros(len: usize) -> Result<GpuVector> {
        GpuVector::alloc(len, true)
    }

    /// A vector whose contents are unspecified until written.
    pub fn uninit(len: usize) -> Result<GpuVector> {
        GpuVector::alloc(len, false)
    }

    fn alloc(len: usize, clear: bool) -> Result<GpuVector> {
        if len == 0 {
            return Err(Error::Construction("a vector needs at least one element".into()));
        }
        let buf = device::get()?.alloc(len, clear)?;
        Ok(GpuVector { buf })
    }

    pub fn filled(len: usize, value: f32) -> Result<GpuVector> {
        let mut v = GpuVector::uninit(len)?;
        device::get()?.fill(&mut v.buf, value)?;
        Ok(v)
    }

    pub fn from_slice(values: &[f32]) -> Result<GpuVector> {
        GpuVector::from_host(&CpuVector::from_slice(values)?)
    }

    /// Host to device copy.
    pub fn from_host(v: &CpuVector) -> Result<GpuVector> {
        let buf = device::get()?.upload(v.as_slice())?;
        Ok(GpuVector { buf })
    }

    /// Device to host copy.
    pub fn to_host(&self) -> Result<CpuVector> {
        let data = device::get()?.download(&self.buf);
        CpuVector::from_vec(data)
    }

    pub fn try_clone(&self) -> Result<GpuVector> {
        let buf = device::get()?.duplicate(&self.buf)?;
        Ok(GpuVector { buf })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn check_same(&self, other: &GpuVector, op: &str) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::dims(op, self.len(), other.len()));
        }
        Ok(())
    }

    pub fn sum(&self) -> Result<f32> {
        device::get()?.sum(&self.buf)
    }

    pub fn max(&self) -> Result<f32> {
        device::get()?.max(&self.buf)
    }

    pub fn min(&self) -> Result<f32> {
        device::get()?.min(&self.buf)
    }

    pub fn avg(&self) -> Result<f32> {
        Ok(self.sum()? / self.len() as f32)
    }

    /// Inner product, computed as a 1×n by n×1 product on the device.
    pub fn dot(&self, other: &GpuVector) -> Result<f32> {
        self.check_same(other, "dot")?;
        let dev = device::get()?;
        let mut out = dev.alloc(1, true)?;
        dev.gemv((1, self.len()), &self.buf, &other.buf, &mut out)?;
        Ok(dev.download(&out)[0])
    }

    /// Refills every element from N(0, 1). The values are drawn on the host
    /// and copied across.
    pub fn randn(&mut self, sampler: &mut NormalSampler) -> Result<()> {
        let mut host = vec![0.0; self.len()];
        sampler.fill(&mut host);
        device::get()?.upload_into(&host, &mut self.buf)
    }

    pub fn clear(&mut self) -> Result<()> {
        device::get()?.fill(&mut self.buf, 0.0)
    }

    pub fn copy_from(&mut self, other: &GpuVector) -> Result<()> {
        self.check_same(other, "copy")?;
        device::get()?.copy(&other.buf, &mut self.buf)
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

device_elementwise!(GpuVector);

impl fmt::Display for GpuVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match device::get() {
            Ok(dev) => print::fmt_vector(f, &dev.download(&self.buf)),
            Err(_) => write!(f, "<unavailable device vector>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_host() {
        let v = GpuVector::from_slice(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v.to_host().unwrap().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn arithmetic_matches_host() {
        let a = GpuVector::from_slice(&[1.0, 2.0, 3.0]).unwrap();
        let b = GpuVector::from_slice(&[4.0, 5.0, 6.0]).unwrap();

        assert_eq!(a.dot(&b).unwrap(), 32.0);
        assert_eq!((&a + &b).unwrap().to_host().unwrap().as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!((&a * 2.0).unwrap().to_host().unwrap().as_slice(), &[2.0, 4.0, 6.0]);
        assert_eq!(a.sum().unwrap(), 6.0);
        assert_eq!(a.max().unwrap(), 3.0);
        assert_eq!(a.min().unwrap(), 1.0);
        assert_eq!(a.avg().unwrap(), 2.0);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let a = GpuVector::zeros(3).unwrap();
        let b = GpuVector::zeros(2).unwrap();
        assert!(matches!(&a - &b, Err(Error::Dimension(_))));
    }
}
