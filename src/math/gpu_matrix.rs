use std::fmt;

use super::cpu_matrix::CpuMatrix;
use super::gpu_vector::GpuVector;
use super::print;
use super::random::NormalSampler;
use crate::device::{self, DeviceBuffer};
use crate::error::{Error, Result};

/// A dense row-major matrix resident in accelerator memory.
#[derive(Debug)]
pub struct GpuMatrix {
    rows: usize,
    cols: usize,
    pub(super) buf: DeviceBuffer,
}

impl GpuMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<GpuMatrix> {
        GpuMatrix::alloc(rows, cols, true)
    }

    /// A matrix whose contents are unspecified until written.
    pub fn uninit(rows: usize, cols: usize) -> Result<GpuMatrix> {
        GpuMatrix::alloc(rows, cols, false)
    }

    fn alloc(rows: usize, cols: usize, clear: bool) -> Result<GpuMatrix> {
        if rows == 0 || cols == 0 {
            return Err(Error::Construction(format!(
                "{rows}x{cols} is not a valid matrix shape"
            )));
        }
        let buf = device::get()?.alloc(rows * cols, clear)?;
        Ok(GpuMatrix { rows, cols, buf })
    }

    pub fn filled(rows: usize, cols: usize, value: f32) -> Result<GpuMatrix> {
        let mut m = GpuMatrix::uninit(rows, cols)?;
        device::get()?.fill(&mut m.buf, value)?;
        Ok(m)
    }

    /// Builds a matrix from literal rows, validated like
    /// [`CpuMatrix::from_rows`].
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<GpuMatrix> {
        GpuMatrix::from_host(&CpuMatrix::from_rows(rows)?)
    }

    /// Host to device copy.
    pub fn from_host(m: &CpuMatrix) -> Result<GpuMatrix> {
        let buf = device::get()?.upload(m.as_slice())?;
        Ok(GpuMatrix {
            rows: m.rows(),
            cols: m.cols(),
            buf,
        })
    }

    /// Device to host copy.
    pub fn to_host(&self) -> Result<CpuMatrix> {
        let data = device::get()?.download(&self.buf);
        CpuMatrix::from_vec(self.rows, self.cols, data)
    }

    pub fn try_clone(&self) -> Result<GpuMatrix> {
        let buf = device::get()?.duplicate(&self.buf)?;
        Ok(GpuMatrix {
            rows: self.rows,
            cols: self.cols,
            buf,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn buffer(&self) -> &DeviceBuffer {
        &self.buf
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut DeviceBuffer {
        &mut self.buf
    }

    pub(crate) fn check_same(&self, other: &GpuMatrix, op: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::dims(
                op,
                format!("{}x{}", self.rows, self.cols),
                format!("{}x{}", other.rows, other.cols),
            ));
        }
        Ok(())
    }

    /// `ans = alpha * op(self) * op(b) + beta * ans`, where `op` optionally
    /// transposes its operand.
    pub fn gemm_into(
        &self,
        trans_self: bool,
        b: &GpuMatrix,
        trans_b: bool,
        alpha: f32,
        beta: f32,
        ans: &mut GpuMatrix,
    ) -> Result<()> {
        let (m, n) = if trans_self {
            (self.cols, self.rows)
        } else {
            (self.rows, self.cols)
        };
        let (n2, p) = if trans_b {
            (b.cols, b.rows)
        } else {
            (b.rows, b.cols)
        };

        if n != n2 {
            return Err(Error::dims("dot inner dimension", n, n2));
        }
        if ans.shape() != (m, p) {
            return Err(Error::dims(
                "dot destination",
                format!("{m}x{p}"),
                format!("{}x{}", ans.rows, ans.cols),
            ));
        }

        device::get()?.gemm(
            trans_self,
            trans_b,
            (m, n, p),
            alpha,
            &self.buf,
            &b.buf,
            beta,
            &mut ans.buf,
        )
    }

    /// Matrix product `self · b` into a fresh matrix.
    pub fn dot(&self, b: &GpuMatrix) -> Result<GpuMatrix> {
        let mut ans = GpuMatrix::uninit(self.rows, b.cols)?;
        self.gemm_into(false, b, false, 1.0, 0.0, &mut ans)?;
        Ok(ans)
    }

    /// Accumulating product `ans += self · b`, the same contract as
    /// [`CpuMatrix::dot_into`].
    pub fn dot_into(&self, b: &GpuMatrix, ans: &mut GpuMatrix) -> Result<()> {
        self.gemm_into(false, b, false, 1.0, 1.0, ans)
    }

    /// Matrix-vector product `self · v`.
    pub fn dot_vec(&self, v: &GpuVector) -> Result<GpuVector> {
        if self.cols != v.len() {
            return Err(Error::dims("dot_vec length", self.cols, v.len()));
        }
        let mut out = GpuVector::uninit(self.rows)?;
        device::get()?.gemv((self.rows, self.cols), &self.buf, &v.buf, &mut out.buf)?;
        Ok(out)
    }

    /// `self · w + b`, with `b` added to every row.
    pub fn affine(&self, w: &GpuMatrix, b: &GpuVector) -> Result<GpuMatrix> {
        let mut ans = GpuMatrix::uninit(self.rows, w.cols)?;
        self.affine_into(w, b, &mut ans)?;
        Ok(ans)
    }

    /// Writes `self · w + b` into `ans`, overwriting its contents.
    pub fn affine_into(&self, w: &GpuMatrix, b: &GpuVector, ans: &mut GpuMatrix) -> Result<()> {
        if b.len() != w.cols {
            return Err(Error::dims("affine bias length", w.cols, b.len()));
        }
        self.gemm_into(false, w, false, 1.0, 0.0, ans)?;
        device::get()?.broadcast_sum_rows(&mut ans.buf, &b.buf, (ans.rows, ans.cols))
    }

    /// Column sums written into `dest`.
    pub fn sum_rows_into(&self, dest: &mut GpuVector) -> Result<()> {
        if dest.len() != self.cols {
            return Err(Error::dims("sum_rows destination", self.cols, dest.len()));
        }
        device::get()?.sum_rows(&self.buf, &mut dest.buf, (self.rows, self.cols))
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

    /// `true` when both matrices have the same shape and every pair of
    /// elements differs by at most `eps`.
    pub fn equals(&self, other: &GpuMatrix, eps: f32) -> Result<bool> {
        if self.shape() != other.shape() {
            return Ok(false);
        }
        let diff = (self - other)?;
        // max/min skip NaN, the sum does not
        if diff.sum()?.is_nan() {
            return Ok(false);
        }
        let spread = diff.max()?.max(-diff.min()?);
        Ok(spread <= eps)
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

    pub fn copy_from(&mut self, other: &GpuMatrix) -> Result<()> {
        self.check_same(other, "copy")?;
        device::get()?.copy(&other.buf, &mut self.buf)
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

device_elementwise!(GpuMatrix);

impl fmt::Display for GpuMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match device::get() {
            Ok(dev) => print::fmt_matrix(f, self.rows, self.cols, &dev.download(&self.buf)),
            Err(_) => write!(f, "<unavailable {}x{} device matrix>", self.rows, self.cols),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(rows: &[&[f32]]) -> GpuMatrix {
        GpuMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn dot_into_accumulates_like_the_host() {
        let a = g(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let id = g(&[&[1.0, 0.0], &[0.0, 1.0]]);

        let mut ans = GpuMatrix::zeros(2, 2).unwrap();
        a.dot_into(&id, &mut ans).unwrap();
        a.dot_into(&id, &mut ans).unwrap();
        assert_eq!(ans.to_host().unwrap().as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn affine_broadcasts_bias() {
        let x = g(&[&[1.0, 1.0], &[2.0, 2.0]]);
        let w = g(&[&[1.0], &[1.0]]);
        let b = GpuVector::from_slice(&[0.5]).unwrap();

        let out = x.affine(&w, &b).unwrap().to_host().unwrap();
        assert_eq!(out.as_slice(), &[2.5, 4.5]);

        let bad = GpuVector::zeros(2).unwrap();
        assert!(matches!(x.affine(&w, &bad), Err(Error::Dimension(_))));
    }

    #[test]
    fn equals_uses_tolerance() {
        let a = g(&[&[1.0, 2.0]]);
        let b = g(&[&[1.0005, 2.0]]);
        assert!(a.equals(&b, 1e-3).unwrap());
        assert!(!a.equals(&b, 1e-5).unwrap());

        let c = g(&[&[1.0], &[2.0]]);
        assert!(!a.equals(&c, 1.0).unwrap());

        let x = g(&[&[1.0, 2.0]]);
        let y = g(&[&[f32::NAN, 2.0]]);
        assert!(!x.equals(&y, 1e-6).unwrap());
    }

    #[test]
    fn sum_rows_collapses_batch() {
        let a = g(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);
        let mut sums = GpuVector::zeros(2).unwrap();
        a.sum_rows_into(&mut sums).unwrap();
        assert_eq!(sums.to_host().unwrap().as_slice(), &[9.0, 12.0]);
    }
}
