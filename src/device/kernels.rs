//! Memory transfer routines and linear-algebra kernels of the accelerator.
//!
//! All matrices are row-major. Every kernel checks the buffer lengths against
//! the shape it was given and reports `InvalidValue` on disagreement. A host
//! copy that does not fit its destination reports `MappingError`.

use rayon::prelude::*;

use super::{Device, DeviceBuffer, Status};
use crate::error::Result;

fn expect_len(what: &str, buf: &DeviceBuffer, len: usize) -> Result<()> {
    if buf.len() != len {
        return Err(Status::InvalidValue.error(format!(
            "{what} holds {} elements, expected {len}",
            buf.len()
        )));
    }
    Ok(())
}

impl Device {
    /// Allocates `len` elements. With `clear` the memory is zeroed; without it
    /// the contents are unspecified.
    pub fn alloc(&self, len: usize, clear: bool) -> Result<DeviceBuffer> {
        self.reserve(len)?;
        let mem = vec![0.0; len].into_boxed_slice();
        let mut buf = DeviceBuffer::new(mem);
        if clear {
            self.fill(&mut buf, 0.0)?;
        }
        Ok(buf)
    }

    /// Host to device copy into a fresh allocation.
    pub fn upload(&self, src: &[f32]) -> Result<DeviceBuffer> {
        self.reserve(src.len())?;
        Ok(DeviceBuffer::new(src.to_vec().into_boxed_slice()))
    }

    /// Host to device copy into an existing allocation of the same length.
    pub fn upload_into(&self, src: &[f32], dst: &mut DeviceBuffer) -> Result<()> {
        if dst.len() != src.len() {
            return Err(Status::MappingError.error(format!(
                "cannot map {} host elements onto {} device elements",
                src.len(),
                dst.len()
            )));
        }
        dst.mem.copy_from_slice(src);
        Ok(())
    }

    /// Device to host copy.
    pub fn download(&self, src: &DeviceBuffer) -> Vec<f32> {
        src.mem.to_vec()
    }

    /// Device to device copy into a fresh allocation.
    pub fn duplicate(&self, src: &DeviceBuffer) -> Result<DeviceBuffer> {
        self.reserve(src.len())?;
        Ok(DeviceBuffer::new(src.mem.clone()))
    }

    /// Device to device copy into an existing allocation.
    pub fn copy(&self, src: &DeviceBuffer, dst: &mut DeviceBuffer) -> Result<()> {
        expect_len("copy destination", dst, src.len())?;
        self.launch("copy", || {
            dst.mem
                .par_iter_mut()
                .zip(src.mem.par_iter())
                .for_each(|(d, &s)| *d = s)
        })
    }

    pub fn fill(&self, buf: &mut DeviceBuffer, val: f32) -> Result<()> {
        self.launch("fill", || buf.mem.par_iter_mut().for_each(|x| *x = val))
    }

    /// `y += alpha * x`
    pub fn axpy(&self, alpha: f32, x: &DeviceBuffer, y: &mut DeviceBuffer) -> Result<()> {
        expect_len("axpy y", y, x.len())?;
        self.launch("axpy", || {
            y.mem
                .par_iter_mut()
                .zip(x.mem.par_iter())
                .for_each(|(y, &x)| *y += alpha * x)
        })
    }

    /// `x *= alpha`
    pub fn scal(&self, alpha: f32, x: &mut DeviceBuffer) -> Result<()> {
        self.launch("scal", || x.mem.par_iter_mut().for_each(|x| *x *= alpha))
    }

    /// `x += val`
    pub fn add_scalar(&self, val: f32, x: &mut DeviceBuffer) -> Result<()> {
        self.launch("add_scalar", || x.mem.par_iter_mut().for_each(|x| *x += val))
    }

    /// Elementwise `a *= b`.
    pub fn mul(&self, a: &mut DeviceBuffer, b: &DeviceBuffer) -> Result<()> {
        expect_len("mul rhs", b, a.len())?;
        self.launch("mul", || {
            a.mem
                .par_iter_mut()
                .zip(b.mem.par_iter())
                .for_each(|(a, &b)| *a *= b)
        })
    }

    /// Elementwise `a /= b`.
    pub fn div(&self, a: &mut DeviceBuffer, b: &DeviceBuffer) -> Result<()> {
        expect_len("div rhs", b, a.len())?;
        self.launch("div", || {
            a.mem
                .par_iter_mut()
                .zip(b.mem.par_iter())
                .for_each(|(a, &b)| *a /= b)
        })
    }

    /// Elementwise `x = x^exp`.
    pub fn pow(&self, x: &mut DeviceBuffer, exp: f32) -> Result<()> {
        self.launch("pow", || x.mem.par_iter_mut().for_each(|x| *x = x.powf(exp)))
    }

    pub fn sum(&self, x: &DeviceBuffer) -> Result<f32> {
        self.launch("sum", || x.mem.par_iter().sum::<f32>())
    }

    pub fn max(&self, x: &DeviceBuffer) -> Result<f32> {
        self.launch("max", || {
            x.mem.par_iter().copied().reduce(|| f32::NEG_INFINITY, f32::max)
        })
    }

    pub fn min(&self, x: &DeviceBuffer) -> Result<f32> {
        self.launch("min", || {
            x.mem.par_iter().copied().reduce(|| f32::INFINITY, f32::min)
        })
    }

    /// General matrix product `C = alpha * op(A) * op(B) + beta * C`.
    ///
    /// `op(A)` is m×n and `op(B)` is n×p; `C` is m×p. With `trans_a` the
    /// buffer `a` holds an n×m matrix, with `trans_b` the buffer `b` holds a
    /// p×n matrix. A zero `beta` overwrites `C` without reading it.
    #[allow(clippy::too_many_arguments)]
    pub fn gemm(
        &self,
        trans_a: bool,
        trans_b: bool,
        (m, n, p): (usize, usize, usize),
        alpha: f32,
        a: &DeviceBuffer,
        b: &DeviceBuffer,
        beta: f32,
        c: &mut DeviceBuffer,
    ) -> Result<()> {
        expect_len("gemm A", a, m * n)?;
        expect_len("gemm B", b, n * p)?;
        expect_len("gemm C", c, m * p)?;

        let a = &a.mem;
        let b = &b.mem;

        self.launch("gemm", || {
            c.mem.par_chunks_mut(p).enumerate().for_each(|(i, row)| {
                if beta == 0.0 {
                    row.iter_mut().for_each(|c| *c = 0.0);
                } else if beta != 1.0 {
                    row.iter_mut().for_each(|c| *c *= beta);
                }

                for j in 0..n {
                    let pivot = alpha * if trans_a { a[j * m + i] } else { a[i * n + j] };
                    for (k, c) in row.iter_mut().enumerate() {
                        let bjk = if trans_b { b[k * n + j] } else { b[j * p + k] };
                        *c += pivot * bjk;
                    }
                }
            })
        })
    }

    /// Matrix-vector product `y = A * x` for an m×n matrix.
    pub fn gemv(
        &self,
        (m, n): (usize, usize),
        a: &DeviceBuffer,
        x: &DeviceBuffer,
        y: &mut DeviceBuffer,
    ) -> Result<()> {
        expect_len("gemv A", a, m * n)?;
        expect_len("gemv x", x, n)?;
        expect_len("gemv y", y, m)?;

        let a = &a.mem;
        let x = &x.mem;

        self.launch("gemv", || {
            y.mem.par_iter_mut().enumerate().for_each(|(i, y)| {
                *y = a[i * n..(i + 1) * n]
                    .iter()
                    .zip(x.iter())
                    .map(|(a, x)| a * x)
                    .sum();
            })
        })
    }

    /// Adds the length-n vector `b` to every row of the m×n matrix `a`.
    pub fn broadcast_sum_rows(
        &self,
        a: &mut DeviceBuffer,
        b: &DeviceBuffer,
        (m, n): (usize, usize),
    ) -> Result<()> {
        expect_len("broadcast target", a, m * n)?;
        expect_len("broadcast vector", b, n)?;

        let b = &b.mem;
        self.launch("broadcast_sum_rows", || {
            a.mem.par_chunks_mut(n).for_each(|row| {
                row.iter_mut().zip(b.iter()).for_each(|(a, &b)| *a += b)
            })
        })
    }

    /// Column sums of the m×n matrix `a` written into `dest` (length n).
    pub fn sum_rows(
        &self,
        a: &DeviceBuffer,
        dest: &mut DeviceBuffer,
        (m, n): (usize, usize),
    ) -> Result<()> {
        expect_len("sum_rows source", a, m * n)?;
        expect_len("sum_rows destination", dest, n)?;

        let a = &a.mem;
        self.launch("sum_rows", || {
            dest.mem.par_iter_mut().enumerate().for_each(|(k, d)| {
                *d = (0..m).map(|i| a[i * n + k]).sum();
            })
        })
    }

    /// `fx = 1 / (1 + e^-x)`
    pub fn sigmoid_fx(&self, x: &DeviceBuffer, fx: &mut DeviceBuffer) -> Result<()> {
        expect_len("sigmoid output", fx, x.len())?;
        self.launch("sigmoid_fx", || {
            fx.mem
                .par_iter_mut()
                .zip(x.mem.par_iter())
                .for_each(|(fx, &z)| *fx = 1.0 / (1.0 + (-z).exp()))
        })
    }

    /// `dx = fx * (1 - fx)`, the sigmoid derivative from cached activations.
    pub fn sigmoid_dx(&self, fx: &DeviceBuffer, dx: &mut DeviceBuffer) -> Result<()> {
        expect_len("sigmoid gradient", dx, fx.len())?;
        self.launch("sigmoid_dx", || {
            dx.mem
                .par_iter_mut()
                .zip(fx.mem.par_iter())
                .for_each(|(dx, &s)| *dx = s * (1.0 - s))
        })
    }
}
