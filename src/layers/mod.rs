pub mod layer;
pub mod dense;
pub mod dropout;

pub use layer::Layer;
pub use dense::{Dense, Initializer};
pub use dropout::Dropout;
