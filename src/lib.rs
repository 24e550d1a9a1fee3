pub mod data;
pub mod device;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod train;

// Convenience re-exports
pub use data::{ColumnSource, ColumnStats};
pub use device::DeviceConfig;
pub use error::{Error, Result};
pub use layers::{Affine, Layer, MinSquare, Sigmoid};
pub use loss::MseLoss;
pub use math::{CpuMatrix, CpuVector, Domain, GpuMatrix, GpuVector, Matrix, NormalSampler, PrintLimits, Vector};
pub use network::{LayerSpec, Network, NetworkSpec};
pub use train::{train_loop, IterationStats, TrainConfig};
