use std::fmt;

use crate::error::{Error, Result};
use crate::math::{Domain, Matrix, NormalSampler, Vector};

/// How a layer decides its output width when a network chains dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Output width equals input width.
    Preserve,
    /// A learned projection; `Some(n)` pins the output width to `n`.
    Project(Option<usize>),
}

/// The contract every layer implements.
///
/// A layer goes through `set_dim` → `init` → (`forward` → `backward` →
/// `update`)*. `backward` needs a `forward` in the same step; calling it
/// earlier reports [`Error::NullReference`].
pub trait Layer: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    fn core(&self) -> &LayerCore;

    fn core_mut(&mut self) -> &mut LayerCore;

    fn width(&self) -> Width {
        Width::Preserve
    }

    fn set_dim(&mut self, input: usize, output: usize) -> Result<()> {
        self.core_mut().set_dim(input, output)
    }

    fn use_accelerator(&mut self, accelerator: bool) {
        self.core_mut().accelerator = accelerator;
    }

    /// Allocates (or reallocates) every owned tensor and randomizes the
    /// parameters.
    fn init(&mut self, sampler: &mut NormalSampler) -> Result<()>;

    fn forward(&mut self, x: &Matrix) -> Result<&Matrix>;

    /// Takes the gradient with respect to the output and returns the
    /// gradient with respect to the input. A loss layer takes the target
    /// instead.
    fn backward(&mut self, d_out: &Matrix) -> Result<&Matrix>;

    /// Applies the gradients of the last `backward`.
    fn update(&mut self, _alpha: f32) -> Result<()> {
        Ok(())
    }

    fn is_loss(&self) -> bool {
        false
    }

    fn set_weights(&mut self, _w: &Matrix) -> Result<()> {
        Err(Error::Network(format!("{} has no weights", self.name())))
    }

    fn set_bias(&mut self, _b: &Vector) -> Result<()> {
        Err(Error::Network(format!("{} has no bias", self.name())))
    }

    fn dims(&self) -> (usize, usize) {
        (self.core().input, self.core().output)
    }

    fn fx(&self) -> Result<&Matrix> {
        self.core().fx()
    }

    fn dx(&self) -> Result<&Matrix> {
        self.core().dx()
    }

    fn has_fx(&self) -> bool {
        self.core().fx.is_some()
    }

    /// Writes the diagnostic dump used by `Display`.
    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (input, output) = self.dims();
        writeln!(f, "{}({input} -> {output})", self.name())
    }
}

impl fmt::Display for dyn Layer + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f)
    }
}

/// State shared by every layer: dimensions, domain flag and the two
/// single-slot caches.
#[derive(Debug, Default)]
pub struct LayerCore {
    pub(crate) input: usize,
    pub(crate) output: usize,
    pub(crate) accelerator: bool,
    pub(crate) fx: Option<Matrix>,
    pub(crate) dx: Option<Matrix>,
}

impl LayerCore {
    pub fn set_dim(&mut self, input: usize, output: usize) -> Result<()> {
        if input == 0 || output == 0 {
            return Err(Error::Construction(format!(
                "layer dimensions must be positive, got {input} -> {output}"
            )));
        }
        self.input = input;
        self.output = output;
        Ok(())
    }

    pub fn domain(&self) -> Domain {
        Domain::from_flag(self.accelerator)
    }

    /// Drops both caches.
    pub fn release(&mut self) {
        self.fx = None;
        self.dx = None;
    }

    pub fn fx(&self) -> Result<&Matrix> {
        self.fx.as_ref().ok_or(Error::NullReference("layer output"))
    }

    pub fn dx(&self) -> Result<&Matrix> {
        self.dx.as_ref().ok_or(Error::NullReference("layer input gradient"))
    }

    /// The output cache, reused when its shape and domain already match.
    pub fn init_fx(&mut self, rows: usize, cols: usize) -> Result<&mut Matrix> {
        let domain = self.domain();
        reuse_or_alloc(&mut self.fx, rows, cols, domain)
    }

    /// The input-gradient cache, reused when its shape and domain already
    /// match.
    pub fn init_dx(&mut self, rows: usize, cols: usize) -> Result<&mut Matrix> {
        let domain = self.domain();
        reuse_or_alloc(&mut self.dx, rows, cols, domain)
    }

    /// The cached output next to a prepared input-gradient buffer of the same
    /// shape.
    pub fn fx_and_dx(&mut self) -> Result<(&Matrix, &mut Matrix)> {
        let domain = self.domain();
        let fx = self.fx.as_ref().ok_or(Error::NullReference("layer output"))?;
        let (rows, cols) = fx.shape();
        let dx = reuse_or_alloc(&mut self.dx, rows, cols, domain)?;
        Ok((fx, dx))
    }

    /// Fails unless `x` lives in this layer's domain and has `cols` columns.
    pub fn check_input(&self, x: &Matrix, cols: usize, what: &str) -> Result<()> {
        let domain = self.domain();
        if x.domain() != domain {
            return Err(Error::Cast {
                expected: domain,
                actual: x.domain(),
            });
        }
        if x.cols() != cols {
            return Err(Error::dims(what, cols, x.cols()));
        }
        Ok(())
    }
}

pub(crate) fn reuse_or_alloc(
    slot: &mut Option<Matrix>,
    rows: usize,
    cols: usize,
    domain: Domain,
) -> Result<&mut Matrix> {
    let reusable = matches!(slot, Some(m) if m.shape() == (rows, cols) && m.domain() == domain);
    if !reusable {
        *slot = Some(Matrix::zeros(rows, cols, domain)?);
    }
    slot.as_mut().ok_or(Error::NullReference("layer cache"))
}
