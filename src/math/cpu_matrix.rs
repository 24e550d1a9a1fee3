use std::fmt;

use super::cpu_vector::CpuVector;
use super::print;
use super::random::NormalSampler;
use crate::error::{Error, Result};

/// A dense row-major matrix held in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl CpuMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<CpuMatrix> {
        CpuMatrix::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f32) -> Result<CpuMatrix> {
        check_shape(rows, cols)?;
        Ok(CpuMatrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        })
    }

    /// Builds a matrix from literal rows. Every row must have the same,
    /// non-zero length.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<CpuMatrix> {
        let first = rows
            .first()
            .ok_or_else(|| Error::Construction("a matrix needs at least one row".into()))?;
        let cols = first.as_ref().len();
        check_shape(rows.len(), cols)?;

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::Construction(format!(
                    "row {i} has {} elements, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(CpuMatrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Wraps row-major `data` as a `rows`×`cols` matrix.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<CpuMatrix> {
        check_shape(rows, cols)?;
        if data.len() != rows * cols {
            return Err(Error::Construction(format!(
                "{} values cannot fill a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(CpuMatrix { rows, cols, data })
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
        self.data.len()
    }

    /// Always `false`; a matrix holds at least one element.
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

    /// Element at flat row-major index `idx`.
    pub fn at(&self, idx: usize) -> Result<f32> {
        self.data.get(idx).copied().ok_or_else(|| {
            Error::Index(format!("element {idx} of a {}x{} matrix", self.rows, self.cols))
        })
    }

    pub fn get(&self, i: usize, j: usize) -> Result<f32> {
        self.check_index(i, j)?;
        Ok(self.data[i * self.cols + j])
    }

    pub fn set(&mut self, i: usize, j: usize, value: f32) -> Result<()> {
        self.check_index(i, j)?;
        self.data[i * self.cols + j] = value;
        Ok(())
    }

    pub fn row(&self, i: usize) -> Result<&[f32]> {
        if i >= self.rows {
            return Err(Error::Index(format!("row {i} of a matrix with {} rows", self.rows)));
        }
        Ok(&self.data[i * self.cols..(i + 1) * self.cols])
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.rows || j >= self.cols {
            return Err(Error::Index(format!(
                "({i}, {j}) in a {}x{} matrix",
                self.rows, self.cols
            )));
        }
        Ok(())
    }

    /// Copies the column range `[start, end)` into a new matrix.
    pub fn sltcols(&self, start: usize, end: usize) -> Result<CpuMatrix> {
        if start >= end || end > self.cols {
            return Err(Error::Index(format!(
                "columns [{start}, {end}) of a matrix with {} columns",
                self.cols
            )));
        }

        let width = end - start;
        let mut data = Vec::with_capacity(self.rows * width);
        for row in self.data.chunks(self.cols) {
            data.extend_from_slice(&row[start..end]);
        }

        Ok(CpuMatrix {
            rows: self.rows,
            cols: width,
            data,
        })
    }

    pub fn transpose(&self) -> CpuMatrix {
        let mut data = vec![0.0; self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }

        CpuMatrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    pub(crate) fn check_same(&self, other: &CpuMatrix, op: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::dims(
                op,
                format!("{}x{}", self.rows, self.cols),
                format!("{}x{}", other.rows, other.cols),
            ));
        }
        Ok(())
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> CpuMatrix {
        CpuMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    fn map_inplace(&mut self, f: impl Fn(f32) -> f32) {
        self.data.iter_mut().for_each(|x| *x = f(*x));
    }

    fn zip_inplace(&mut self, rhs: &CpuMatrix, op: &str, f: impl Fn(f32, f32) -> f32) -> Result<()> {
        self.check_same(rhs, op)?;
        self.data
            .iter_mut()
            .zip(rhs.data.iter())
            .for_each(|(a, &b)| *a = f(*a, b));
        Ok(())
    }

    /// Matrix product `self · b` into a fresh matrix.
    pub fn dot(&self, b: &CpuMatrix) -> Result<CpuMatrix> {
        let mut ans = CpuMatrix::zeros(self.rows, b.cols)?;
        self.dot_into(b, &mut ans)?;
        Ok(ans)
    }

    /// Accumulating product `ans += self · b`.
    ///
    /// `ans` is not cleared first; call [`clear`](Self::clear) beforehand for a
    /// plain product.
    pub fn dot_into(&self, b: &CpuMatrix, ans: &mut CpuMatrix) -> Result<()> {
        if self.cols != b.rows {
            return Err(Error::dims("dot inner dimension", self.cols, b.rows));
        }
        if ans.shape() != (self.rows, b.cols) {
            return Err(Error::dims(
                "dot destination",
                format!("{}x{}", self.rows, b.cols),
                format!("{}x{}", ans.rows, ans.cols),
            ));
        }

        let p = b.cols;
        for (a_row, ans_row) in self.data.chunks(self.cols).zip(ans.data.chunks_mut(p)) {
            for (j, &a) in a_row.iter().enumerate() {
                let b_row = &b.data[j * p..(j + 1) * p];
                for (c, &bv) in ans_row.iter_mut().zip(b_row.iter()) {
                    *c += a * bv;
                }
            }
        }
        Ok(())
    }

    /// Matrix-vector product `self · v`.
    pub fn dot_vec(&self, v: &CpuVector) -> Result<CpuVector> {
        if self.cols != v.len() {
            return Err(Error::dims("dot_vec length", self.cols, v.len()));
        }

        let out = self
            .data
            .chunks(self.cols)
            .map(|row| row.iter().zip(v.as_slice()).map(|(a, b)| a * b).sum())
            .collect();
        CpuVector::from_vec(out)
    }

    /// `self · w + b`, with `b` added to every row.
    pub fn affine(&self, w: &CpuMatrix, b: &CpuVector) -> Result<CpuMatrix> {
        let mut ans = CpuMatrix::zeros(self.rows, w.cols)?;
        self.affine_into(w, b, &mut ans)?;
        Ok(ans)
    }

    /// Writes `self · w + b` into `ans`, overwriting its contents.
    pub fn affine_into(&self, w: &CpuMatrix, b: &CpuVector, ans: &mut CpuMatrix) -> Result<()> {
        if b.len() != w.cols {
            return Err(Error::dims("affine bias length", w.cols, b.len()));
        }

        ans.clear();
        self.dot_into(w, ans)?;
        for row in ans.data.chunks_mut(w.cols) {
            row.iter_mut()
                .zip(b.as_slice())
                .for_each(|(x, &bias)| *x += bias);
        }
        Ok(())
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

    pub fn randn(&mut self, sampler: &mut NormalSampler) {
        sampler.fill(&mut self.data);
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.0);
    }

    pub fn copy_from(&mut self, other: &CpuMatrix) -> Result<()> {
        self.check_same(other, "copy")?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn print(&self) {
        println!("{self}");
    }
}

host_elementwise!(CpuMatrix);

fn check_shape(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(Error::Construction(format!(
            "{rows}x{cols} is not a valid matrix shape"
        )));
    }
    Ok(())
}

impl fmt::Display for CpuMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print::fmt_matrix(f, self.rows, self.cols, &self.data)
    }
}
