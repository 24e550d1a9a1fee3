use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::{self, DeviceConfig};
use crate::error::Result;
use crate::layers::{Affine, Layer, MinSquare, Sigmoid};
use crate::math::{NormalSampler, PrintLimits};
use crate::network::network::Network;

/// One layer of a network description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    /// Fully connected layer; `units` pins its output width, otherwise the
    /// network chooses it.
    Affine {
        #[serde(default)]
        units: Option<usize>,
    },
    Sigmoid,
    MinSquare,
}

impl LayerSpec {
    pub fn build(&self) -> Box<dyn Layer> {
        match self {
            LayerSpec::Affine { units: Some(n) } => Box::new(Affine::with_units(*n)),
            LayerSpec::Affine { units: None } => Box::new(Affine::new()),
            LayerSpec::Sigmoid => Box::new(Sigmoid::new()),
            LayerSpec::MinSquare => Box::new(MinSquare::new()),
        }
    }
}

fn default_alpha() -> f32 {
    Network::DEFAULT_ALPHA
}

/// A serializable description of a network architecture and how to run it.
///
/// Only the architecture is stored; trained parameters are never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name.
    pub name: String,
    /// Learning rate.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Train on the accelerator instead of the host.
    #[serde(default)]
    pub accelerator: bool,
    /// Seed for parameter initialization; unseeded specs use the process-wide
    /// sampler.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ordered layer list (input → output).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub device: Option<DeviceConfig>,
    #[serde(default)]
    pub print: Option<PrintLimits>,
}

impl NetworkSpec {
    /// Builds an unbound network. Applies the print limits, if any.
    pub fn build<'a>(&self) -> Network<'a> {
        if let Some(limits) = self.print {
            limits.apply();
        }

        let mut network = Network::new();
        network.set_alpha(self.alpha);
        if let Some(seed) = self.seed {
            network.set_sampler(NormalSampler::seeded(seed));
        }
        for layer in &self.layers {
            network.push_boxed(layer.build());
        }
        network
    }

    /// Starts the accelerator with this spec's device section. Does nothing
    /// when the spec has none.
    pub fn configure_device(&self) -> Result<()> {
        if let Some(config) = &self.device {
            device::configure(config.clone())?;
        }
        Ok(())
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
