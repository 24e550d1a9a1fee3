pub mod affine;
pub mod layer;
pub mod min_square;
pub mod sigmoid;

pub use affine::Affine;
pub use layer::{Layer, LayerCore, Width};
pub use min_square::MinSquare;
pub use sigmoid::Sigmoid;
