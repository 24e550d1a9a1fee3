//! Dense linear algebra over two storage domains.
//!
//! [`CpuVector`]/[`CpuMatrix`] live in host memory, [`GpuVector`]/[`GpuMatrix`]
//! live on the accelerator. [`Matrix`] and [`Vector`] tag either one, and
//! [`dispatch`] narrows them back.

#[macro_use]
mod ops;

pub mod cpu_matrix;
pub mod cpu_vector;
pub mod dispatch;
pub mod gpu_matrix;
pub mod gpu_vector;
pub mod print;
pub mod random;
pub mod tensor;

pub use cpu_matrix::CpuMatrix;
pub use cpu_vector::CpuVector;
pub use dispatch::{as_accelerator, as_accelerator_mut, as_host, as_host_mut, is_accelerator, is_host, Dispatch};
pub use gpu_matrix::GpuMatrix;
pub use gpu_vector::GpuVector;
pub use print::PrintLimits;
pub use random::NormalSampler;
pub use tensor::{Domain, Matrix, Vector};
