use std::fmt;

use log::debug;

use super::layer::{reuse_or_alloc, Layer, LayerCore, Width};
use crate::error::{Error, Result};
use crate::math::{Matrix, NormalSampler, Vector};

/// Fully connected layer, `fx = x · W + b`.
///
/// `W` is `in`×`out` and `b` has length `out`; both start from N(0, 1). The
/// input of the last forward pass is copied into an owned cache for the
/// weight gradient.
#[derive(Debug, Default)]
pub struct Affine {
    core: LayerCore,
    units: Option<usize>,
    w: Option<Matrix>,
    b: Option<Vector>,
    dw: Option<Matrix>,
    db: Option<Vector>,
    x: Option<Matrix>,
    batch: usize,
}

impl Affine {
    /// A layer whose output width is chosen by the network.
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer with a fixed output width.
    pub fn with_units(units: usize) -> Self {
        Self {
            units: Some(units),
            ..Self::default()
        }
    }

    pub fn weights(&self) -> Result<&Matrix> {
        self.w.as_ref().ok_or(Error::NullReference("affine weights"))
    }

    pub fn bias(&self) -> Result<&Vector> {
        self.b.as_ref().ok_or(Error::NullReference("affine bias"))
    }

    pub fn weight_grad(&self) -> Result<&Matrix> {
        self.dw.as_ref().ok_or(Error::NullReference("affine weight gradient"))
    }

    pub fn bias_grad(&self) -> Result<&Vector> {
        self.db.as_ref().ok_or(Error::NullReference("affine bias gradient"))
    }

    fn backward_host(&mut self, d_out: &Matrix) -> Result<()> {
        let x = self.x.as_ref().ok_or(Error::NullReference("affine input"))?.as_host()?;
        let w = self.w.as_ref().ok_or(Error::NullReference("affine weights"))?.as_host()?;
        let dw = self.dw.as_mut().ok_or(Error::NullReference("affine weight gradient"))?.as_host_mut()?;
        let db = self.db.as_mut().ok_or(Error::NullReference("affine bias gradient"))?.as_host_mut()?;
        let d_out = d_out.as_host()?;

        let (batch, input, output) = (x.rows(), self.core.input, self.core.output);
        let domain = self.core.domain();
        let dx = reuse_or_alloc(&mut self.core.dx, batch, input, domain)?.as_host_mut()?;

        dx.clear();
        dw.clear();
        db.clear();

        let (x, w, g) = (x.as_slice(), w.as_slice(), d_out.as_slice());
        let (dx, dw, db) = (dx.as_mut_slice(), dw.as_mut_slice(), db.as_mut_slice());

        for i in 0..batch {
            for k in 0..output {
                let grad = g[i * output + k];
                db[k] += grad;
                for j in 0..input {
                    dx[i * input + j] += grad * w[j * output + k];
                    dw[j * output + k] += grad * x[i * input + j];
                }
            }
        }
        Ok(())
    }

    fn backward_device(&mut self, d_out: &Matrix) -> Result<()> {
        let x = self.x.as_ref().ok_or(Error::NullReference("affine input"))?.as_accelerator()?;
        let w = self.w.as_ref().ok_or(Error::NullReference("affine weights"))?.as_accelerator()?;
        let dw = self.dw.as_mut().ok_or(Error::NullReference("affine weight gradient"))?.as_accelerator_mut()?;
        let db = self.db.as_mut().ok_or(Error::NullReference("affine bias gradient"))?.as_accelerator_mut()?;
        let d_out = d_out.as_accelerator()?;

        let (batch, input) = (x.rows(), self.core.input);
        let domain = self.core.domain();
        let dx = reuse_or_alloc(&mut self.core.dx, batch, input, domain)?.as_accelerator_mut()?;

        // dX = dOut · Wᵀ, dW = Xᵀ · dOut, db = column sums of dOut
        d_out.gemm_into(false, w, true, 1.0, 0.0, dx)?;
        x.gemm_into(true, d_out, false, 1.0, 0.0, dw)?;
        d_out.sum_rows_into(db)
    }
}

impl Layer for Affine {
    fn name(&self) -> &'static str {
        "Affine"
    }

    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn width(&self) -> Width {
        Width::Project(self.units)
    }

    fn init(&mut self, sampler: &mut NormalSampler) -> Result<()> {
        let (input, output) = (self.core.input, self.core.output);
        if input == 0 || output == 0 {
            return Err(Error::Network("affine layer initialized before set_dim".into()));
        }
        let domain = self.core.domain();

        self.core.release();
        self.x = None;
        self.batch = 0;

        let mut w = Matrix::zeros(input, output, domain)?;
        let mut b = Vector::zeros(output, domain)?;
        w.randn(sampler)?;
        b.randn(sampler)?;

        self.w = Some(w);
        self.b = Some(b);
        self.dw = Some(Matrix::zeros(input, output, domain)?);
        self.db = Some(Vector::zeros(output, domain)?);

        debug!("affine layer initialized: {input} -> {output} on {domain}");
        Ok(())
    }

    fn forward(&mut self, x: &Matrix) -> Result<&Matrix> {
        self.core.check_input(x, self.core.input, "affine input width")?;
        let (batch, output) = (x.rows(), self.core.output);

        let domain = self.core.domain();
        let cached = reuse_or_alloc(&mut self.x, batch, self.core.input, domain)?;
        cached.copy_from(x)?;
        self.batch = batch;

        let w = self.w.as_ref().ok_or(Error::NullReference("affine weights"))?;
        let b = self.b.as_ref().ok_or(Error::NullReference("affine bias"))?;
        let fx = self.core.init_fx(batch, output)?;

        match (x, w, b, fx) {
            (Matrix::Host(x), Matrix::Host(w), Vector::Host(b), Matrix::Host(fx)) => {
                x.affine_into(w, b, fx)?
            }
            (Matrix::Accelerator(x), Matrix::Accelerator(w), Vector::Accelerator(b), Matrix::Accelerator(fx)) => {
                x.affine_into(w, b, fx)?
            }
            (x, w, _, _) => {
                return Err(Error::Cast {
                    expected: w.domain(),
                    actual: x.domain(),
                })
            }
        }

        self.core.fx()
    }

    fn backward(&mut self, d_out: &Matrix) -> Result<&Matrix> {
        if self.batch == 0 {
            return Err(Error::NullReference("affine input"));
        }
        if d_out.shape() != (self.batch, self.core.output) {
            return Err(Error::dims(
                "affine output gradient",
                format!("{}x{}", self.batch, self.core.output),
                format!("{}x{}", d_out.rows(), d_out.cols()),
            ));
        }

        if self.core.accelerator {
            self.backward_device(d_out)?;
        } else {
            self.backward_host(d_out)?;
        }

        self.core.dx()
    }

    fn update(&mut self, alpha: f32) -> Result<()> {
        if self.batch == 0 {
            return Ok(());
        }
        let step = -alpha / self.batch as f32;

        if let (Some(w), Some(dw)) = (self.w.as_mut(), self.dw.as_ref()) {
            w.axpy(step, dw)?;
        }
        if let (Some(b), Some(db)) = (self.b.as_mut(), self.db.as_ref()) {
            b.axpy(step, db)?;
        }
        Ok(())
    }

    fn set_weights(&mut self, w: &Matrix) -> Result<()> {
        let expected = (self.core.input, self.core.output);
        if w.shape() != expected {
            return Err(Error::dims(
                "affine weights",
                format!("{}x{}", expected.0, expected.1),
                format!("{}x{}", w.rows(), w.cols()),
            ));
        }
        let domain = self.core.domain();
        let copy = w.to_domain(domain)?;
        match self.w.as_mut() {
            Some(current) => current.copy_from(&copy),
            None => {
                self.w = Some(copy);
                Ok(())
            }
        }
    }

    fn set_bias(&mut self, b: &Vector) -> Result<()> {
        if b.len() != self.core.output {
            return Err(Error::dims("affine bias", self.core.output, b.len()));
        }
        let domain = self.core.domain();
        let copy = b.to_domain(domain)?;
        match self.b.as_mut() {
            Some(current) => current.copy_from(&copy),
            None => {
                self.b = Some(copy);
                Ok(())
            }
        }
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Affine({} -> {})", self.core.input, self.core.output)?;
        if let Some(w) = &self.w {
            writeln!(f, "W = {w}")?;
        }
        if let Some(b) = &self.b {
            writeln!(f, "b = {b}")?;
        }
        Ok(())
    }
}
