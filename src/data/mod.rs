//! The seam through which tabular data reaches a network.
//!
//! Loaders implement [`ColumnSource`]; a network only ever sees the dense host
//! matrix it produces.

use crate::error::{Error, Result};
use crate::math::{CpuMatrix, CpuVector};

/// Per-column mean and standard deviation used to standardize features.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub mean: Vec<f32>,
    pub stdev: Vec<f32>,
}

impl ColumnStats {
    /// Population statistics of every column of `m`.
    pub fn from_matrix(m: &CpuMatrix) -> Result<ColumnStats> {
        let t = m.transpose();
        let mut mean = Vec::with_capacity(t.rows());
        let mut stdev = Vec::with_capacity(t.rows());

        for j in 0..t.rows() {
            let column = CpuVector::from_slice(t.row(j)?)?;
            mean.push(column.avg());
            stdev.push(column.stdev());
        }

        Ok(ColumnStats { mean, stdev })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Rewrites every element as `(v - mean) / stdev` for its column. Columns
    /// with zero deviation are only centred.
    pub fn standardize(&self, m: &mut CpuMatrix) -> Result<()> {
        if m.cols() != self.len() || self.stdev.len() != self.len() {
            return Err(Error::dims("standardized columns", self.len(), m.cols()));
        }

        let cols = m.cols();
        for row in m.as_mut_slice().chunks_mut(cols) {
            for ((v, &mean), &sd) in row.iter_mut().zip(&self.mean).zip(&self.stdev) {
                *v -= mean;
                if sd > 0.0 {
                    *v /= sd;
                }
            }
        }
        Ok(())
    }
}

/// Anything that can materialize a range of numeric columns.
pub trait ColumnSource {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Columns `[start, end)` as a dense host matrix, standardized with
    /// `stats` when given. `stats` describes exactly the selected columns.
    fn to_matrix(&self, start: usize, end: usize, stats: Option<&ColumnStats>) -> Result<CpuMatrix>;
}

impl ColumnSource for CpuMatrix {
    fn rows(&self) -> usize {
        CpuMatrix::rows(self)
    }

    fn cols(&self) -> usize {
        CpuMatrix::cols(self)
    }

    fn to_matrix(&self, start: usize, end: usize, stats: Option<&ColumnStats>) -> Result<CpuMatrix> {
        let mut out = self.sltcols(start, end)?;
        if let Some(stats) = stats {
            stats.standardize(&mut out)?;
        }
        Ok(out)
    }
}
