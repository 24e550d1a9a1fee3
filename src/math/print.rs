//! Truncating text dumps of tensors.
//!
//! Two process-wide limits bound how much of a tensor is written: the number
//! of vector elements, and the number of matrix rows and columns.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

static VECTOR_PRINT_MAX: AtomicUsize = AtomicUsize::new(100);
static MATRIX_PRINT_MAX: AtomicUsize = AtomicUsize::new(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLimits {
    /// Elements shown for a vector.
    pub vector: usize,
    /// Rows, and columns per row, shown for a matrix.
    pub matrix: usize,
}

impl Default for PrintLimits {
    fn default() -> Self {
        Self {
            vector: 100,
            matrix: 100,
        }
    }
}

impl PrintLimits {
    pub fn current() -> Self {
        Self {
            vector: VECTOR_PRINT_MAX.load(Ordering::Relaxed),
            matrix: MATRIX_PRINT_MAX.load(Ordering::Relaxed),
        }
    }

    /// Installs these limits process-wide.
    pub fn apply(self) {
        VECTOR_PRINT_MAX.store(self.vector, Ordering::Relaxed);
        MATRIX_PRINT_MAX.store(self.matrix, Ordering::Relaxed);
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, values: &[f32], limit: usize) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().take(limit).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v:.4}")?;
    }
    if values.len() > limit {
        write!(f, "{}...", if limit > 0 { ", " } else { "" })?;
    }
    write!(f, "]")
}

pub(crate) fn fmt_vector(f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
    write_row(f, values, VECTOR_PRINT_MAX.load(Ordering::Relaxed))
}

pub(crate) fn fmt_matrix(
    f: &mut fmt::Formatter<'_>,
    rows: usize,
    cols: usize,
    values: &[f32],
) -> fmt::Result {
    let limit = MATRIX_PRINT_MAX.load(Ordering::Relaxed);

    writeln!(f, "{rows}x{cols}")?;
    for row in values.chunks(cols).take(limit) {
        write_row(f, row, limit)?;
        writeln!(f)?;
    }
    if rows > limit {
        writeln!(f, "...")?;
    }
    Ok(())
}
