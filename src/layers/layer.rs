use std::fmt;

use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Sgd;
use crate::regularization::Regularizer;

/// The capability set every layer in a `Sequential` stack provides.
///
/// A layer sees only its own parameters and the width of its input. The
/// call protocol within one training step is
/// `forwardprop` → `backprop` (or `backprop_output` on the last layer) → `update`,
/// and each step only ever refers to the most recent call before it.
pub trait Layer: fmt::Debug {
    /// Short human-readable kind, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Position in the stack, assigned by `init`.
    fn id(&self) -> Option<usize>;

    /// Explicit input width, required only on the first layer of a stack.
    fn declared_input_width(&self) -> Option<usize>;

    /// Output width. Only meaningful after `init`.
    fn units(&self) -> usize;

    /// One-time setup: records the id and allocates parameters for
    /// `(input_width, units)`. A second call is a contract violation.
    fn init(&mut self, id: usize, input_width: usize) -> Result<()>;

    /// Receives the optimizer configuration when the model is built.
    fn set_optimizer(&mut self, optimizer: Sgd);

    /// Inference transform. Caches nothing and disables stochastic behaviour.
    ///
    /// `input` must have `declared_input_width()` columns; `Sequential` checks
    /// this before calling. A layer may panic on any other width.
    fn predict(&self, input: &Matrix) -> Matrix;

    /// Training transform; caches what the next `backprop` needs. Same input
    /// width requirement as `predict`.
    fn forwardprop(&mut self, input: &Matrix) -> Matrix;

    /// Takes ∂L/∂A for this layer's output, stages the parameter gradients
    /// and returns ∂L/∂A for its input.
    fn backprop(&mut self, grad: &Matrix) -> Result<Matrix>;

    /// Entry point for the last layer: takes the loss error signal dZ
    /// directly instead of a gradient with respect to the activations.
    fn backprop_output(&mut self, delta: &Matrix) -> Result<Matrix>;

    /// Applies one gradient step using the staged gradients.
    fn update(&mut self) -> Result<()>;

    /// The layer's weight penalty together with the weights it applies to.
    fn regularizer(&self) -> Option<(&Regularizer, &Matrix)> {
        None
    }
}
