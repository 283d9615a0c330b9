pub mod regularizer;

pub use regularizer::Regularizer;

use crate::layers::Layer;

/// Sums the penalty of every layer that carries a regularizer. Layers
/// without one contribute nothing, so an unregularized stack yields 0.
pub fn regularization_loss(layers: &[Box<dyn Layer>], batch_size: usize) -> f64 {
    layers
        .iter()
        .filter_map(|layer| layer.regularizer())
        .map(|(regularizer, weights)| regularizer.loss(weights, batch_size))
        .sum()
}
