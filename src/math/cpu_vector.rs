use std::fmt;

use super::print;
use super::random::NormalSampler;
use crate::error::{Error, Result};

/// A dense vector held in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuVector {
    data: Vec<f32>,
}

impl CpuVector {
    pub fn zeros(len: usize) -> Result<CpuVector> {
        CpuVector::filled(len, 0.0)
    }

    pub fn filled(len: usize, value: f32) -> Result<CpuVector> {
        CpuVector::from_vec(vec![value; len])
    }

    pub fn from_slice(values: &[f32]) -> Result<CpuVector> {
        CpuVector::from_vec(values.to_vec())
    }

    pub fn from_vec(data: Vec<f32>) -> Result<CpuVector> {
        if data.is_empty() {
            return Err(Error::Construction("a vector needs at least one element".into()));
        }
        Ok(CpuVector { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; a vector holds at least one element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn at(&self, i: usize) -> Result<f32> {
        self.data.get(i).copied().ok_or_else(|| self.out_of_range(i))
    }

    pub fn set(&mut self, i: usize, value: f32) -> Result<()> {
        let len = self.len();
        match self.data.get_mut(i) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::Index(format!("element {i} of a vector of length {len}"))),
        }
    }

    fn out_of_range(&self, i: usize) -> Error {
        Error::Index(format!("element {i} of a vector of length {}", self.len()))
    }

    pub(crate) fn check_same(&self, other: &CpuVector, op: &str) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::dims(op, self.len(), other.len()));
        }
        Ok(())
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> CpuVector {
        CpuVector {
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    fn map_inplace(&mut self, f: impl Fn(f32) -> f32) {
        self.data.iter_mut().for_each(|x| *x = f(*x));
    }

    fn zip_inplace(&mut self, rhs: &CpuVector, op: &str, f: impl Fn(f32, f32) -> f32) -> Result<()> {
        self.check_same(rhs, op)?;
        self.data
            .iter_mut()
            .zip(rhs.data.iter())
            .for_each(|(a, &b)| *a = f(*a, b));
        Ok(())
    }

    /// Inner product.
    pub fn dot(&self, other: &CpuVector) -> Result<f32> {
        self.check_same(other, "dot")?;
        Ok(self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum())
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn avg(&self) -> f32 {
        self.sum() / self.len() as f32
    }

    /// Population variance, accumulated with Welford's streaming update.
    pub fn var(&self) -> f32 {
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;

        for (k, &x) in self.data.iter().enumerate() {
            let x = x as f64;
            let delta = x - mean;
            mean += delta / (k + 1) as f64;
            m2 += delta * (x - mean);
        }

        (m2 / self.len() as f64) as f32
    }

    pub fn stdev(&self) -> f32 {
        self.var().sqrt()
    }

    /// Refills every element from N(0, 1).
    pub fn randn(&mut self, sampler: &mut NormalSampler) {
        sampler.fill(&mut self.data);
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.0);
    }

    pub fn copy_from(&mut self, other: &CpuVector) -> Result<()> {
        self.check_same(other, "copy")?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

host_elementwise!(CpuVector);

impl fmt::Display for CpuVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print::fmt_vector(f, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_vectors() {
        assert!(matches!(CpuVector::zeros(0), Err(Error::Construction(_))));
        assert!(matches!(CpuVector::from_slice(&[]), Err(Error::Construction(_))));
    }

    #[test]
    fn statistics() {
        let v = CpuVector::from_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(v.sum(), 40.0);
        assert_eq!(v.avg(), 5.0);
        assert_eq!(v.max(), 9.0);
        assert_eq!(v.min(), 2.0);
        assert!((v.var() - 4.0).abs() < 1e-6);
        assert!((v.stdev() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn dot_product_and_length_check() {
        let a = CpuVector::from_slice(&[1.0, 2.0, 3.0]).unwrap();
        let b = CpuVector::from_slice(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(a.dot(&b).unwrap(), 32.0);

        let c = CpuVector::zeros(2).unwrap();
        assert!(matches!(a.dot(&c), Err(Error::Dimension(_))));
        assert!(matches!(&a + &c, Err(Error::Dimension(_))));
    }

    #[test]
    fn element_access_is_bounds_checked() {
        let mut v = CpuVector::zeros(3).unwrap();
        v.set(2, 1.5).unwrap();
        assert_eq!(v.at(2).unwrap(), 1.5);
        assert!(matches!(v.at(3), Err(Error::Index(_))));
        assert!(matches!(v.set(3, 0.0), Err(Error::Index(_))));
    }

    #[test]
    fn scalar_operators() {
        let v = CpuVector::from_slice(&[1.0, -2.0]).unwrap();
        assert_eq!((&v * 2.0).as_slice(), &[2.0, -4.0]);
        assert_eq!((2.0 * &v).as_slice(), &[2.0, -4.0]);
        assert_eq!((&v + 1.0).as_slice(), &[2.0, -1.0]);
        assert_eq!((-&v).as_slice(), &[-1.0, 2.0]);
        assert_eq!(v.pow(2.0).as_slice(), &[1.0, 4.0]);
    }
}
