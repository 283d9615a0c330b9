pub mod normalizer;

pub use normalizer::{NormalizationKind, Normalizer};
