use std::fmt;
use std::ops::ShlAssign;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::layers::{Layer, Width};
use crate::loss::MseLoss;
use crate::math::{random, Domain, Matrix, NormalSampler};

/// An ordered stack of layers trained by plain gradient descent.
///
/// The input `X` and target `Y` are borrowed for the lifetime of the network;
/// every forward pass reads `X` directly.
pub struct Network<'a> {
    layers: Vec<Box<dyn Layer>>,
    alpha: f32,
    sampler: Option<NormalSampler>,
    x: Option<&'a Matrix>,
    y: Option<&'a Matrix>,
    // parameters changed since the last forward pass
    stale: bool,
}

impl<'a> Network<'a> {
    pub const DEFAULT_ALPHA: f32 = 0.1;

    pub fn new() -> Self {
        Network {
            layers: Vec::new(),
            alpha: Self::DEFAULT_ALPHA,
            sampler: None,
            x: None,
            y: None,
            stale: true,
        }
    }

    /// Appends a layer. Layers are only bound to dimensions by [`init`](Self::init).
    pub fn push<L: Layer + 'static>(&mut self, layer: L) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn push_boxed(&mut self, layer: Box<dyn Layer>) -> &mut Self {
        self.layers.push(layer);
        self
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn get_alpha(&self) -> f32 {
        self.alpha
    }

    /// Uses `sampler` for parameter initialization instead of the process-wide
    /// one.
    pub fn set_sampler(&mut self, sampler: NormalSampler) {
        self.sampler = Some(sampler);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, idx: usize) -> Option<&dyn Layer> {
        self.layers.get(idx).map(|l| l.as_ref())
    }

    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut (dyn Layer + 'static)> {
        self.layers.get_mut(idx).map(|l| l.as_mut())
    }

    /// Binds the training data, chains layer dimensions and initializes every
    /// layer.
    ///
    /// Parameterized layers take the running width as input. Their output is
    /// their own unit count when set, otherwise `Y.cols` for the last one and
    /// `X.cols` for the others. Every other layer keeps the width unchanged.
    pub fn init(&mut self, x: &'a Matrix, y: &'a Matrix, use_accelerator: bool) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::Network("a network needs at least one layer".into()));
        }
        if x.rows() != y.rows() {
            return Err(Error::dims("target rows", x.rows(), y.rows()));
        }

        let domain = Domain::from_flag(use_accelerator);
        for m in [x, y] {
            if m.domain() != domain {
                return Err(Error::Cast {
                    expected: domain,
                    actual: m.domain(),
                });
            }
        }

        let last = self.layers.len() - 1;
        if let Some(i) = self.layers[..last].iter().position(|l| l.is_loss()) {
            return Err(Error::Network(format!(
                "loss layer `{}` at position {i} must be the last layer",
                self.layers[i].name()
            )));
        }

        let last_projection = self
            .layers
            .iter()
            .rposition(|l| matches!(l.width(), Width::Project(_)));

        let mut width = x.cols();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let output = match layer.width() {
                Width::Preserve => width,
                Width::Project(Some(units)) => units,
                Width::Project(None) if Some(i) == last_projection => y.cols(),
                Width::Project(None) => x.cols(),
            };
            layer.set_dim(width, output)?;
            width = output;
        }

        if width != y.cols() {
            return Err(Error::Network(format!(
                "the last layer produces {width} columns but the target has {}",
                y.cols()
            )));
        }

        let mut fallback = None;
        let sampler = match self.sampler.as_mut() {
            Some(s) => s,
            None => &mut **fallback.insert(random::global().lock()),
        };

        for layer in self.layers.iter_mut() {
            layer.use_accelerator(use_accelerator);
            layer.init(sampler)?;
        }

        self.x = Some(x);
        self.y = Some(y);
        self.stale = true;

        debug!(
            "network bound: {} layers, {}x{} -> {}x{} on {domain}",
            self.layers.len(),
            x.rows(),
            x.cols(),
            y.rows(),
            y.cols()
        );
        Ok(())
    }

    fn bound(&self) -> Result<(&'a Matrix, &'a Matrix)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::Network("network used before init".into())),
        }
    }

    /// Threads `X` through every layer and returns the last output.
    pub fn forward(&mut self) -> Result<&Matrix> {
        let (x, _) = self.bound()?;

        let mut current = x;
        for layer in self.layers.iter_mut() {
            current = layer.forward(current)?;
        }
        self.stale = false;
        Ok(current)
    }

    /// Backpropagates from the target through every layer.
    ///
    /// A terminal loss layer receives `Y` itself; any other last layer receives
    /// the squared-error gradient `h - Y`.
    pub fn backward(&mut self) -> Result<()> {
        let (_, y) = self.bound()?;
        let (last, rest) = self
            .layers
            .split_last_mut()
            .ok_or_else(|| Error::Network("a network needs at least one layer".into()))?;

        let residual;
        let mut grad = if last.is_loss() {
            last.backward(y)?
        } else {
            residual = MseLoss::derivative(last.fx()?, y)?;
            last.backward(&residual)?
        };

        for layer in rest.iter_mut().rev() {
            grad = layer.backward(grad)?;
        }
        Ok(())
    }

    pub fn update(&mut self) -> Result<()> {
        self.stale = true;
        for layer in self.layers.iter_mut() {
            layer.update(self.alpha)?;
        }
        Ok(())
    }

    /// Runs `iterations` rounds of forward, backward and update.
    pub fn train(&mut self, iterations: usize) -> Result<()> {
        for i in 0..iterations {
            self.step()?;
            trace!("iteration {} of {iterations} done", i + 1);
        }
        Ok(())
    }

    pub(crate) fn step(&mut self) -> Result<()> {
        self.forward()?;
        self.backward()?;
        self.update()
    }

    /// Output of the last forward pass.
    pub fn output(&self) -> Result<&Matrix> {
        self.layers
            .last()
            .ok_or_else(|| Error::Network("a network needs at least one layer".into()))?
            .fx()
    }

    /// sum((h - Y)²) / (2 · batch) for the current parameters, running a
    /// forward pass first if the cached output predates the last update.
    pub fn min_square_error(&mut self) -> Result<f32> {
        let (_, y) = self.bound()?;
        let cached = self.layers.last().map(|l| l.has_fx()).unwrap_or(false);
        if self.stale || !cached {
            self.forward()?;
        }
        MseLoss::loss(self.output()?, y)
    }

    pub fn print(&self) {
        print!("{self}");
    }
}

impl Default for Network<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Layer + 'static> ShlAssign<L> for Network<'_> {
    fn shl_assign(&mut self, layer: L) {
        self.push(layer);
    }
}

impl fmt::Display for Network<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network(alpha = {}, {} layers)", self.alpha, self.layers.len())?;
        for layer in &self.layers {
            write!(f, "{}", &**layer)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Network<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("layers", &self.layers)
            .field("alpha", &self.alpha)
            .field("bound", &self.x.is_some())
            .finish()
    }
}
