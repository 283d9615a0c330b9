use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NnError;
use crate::loss::{BceLoss, CrossEntropyLoss, MaeLoss, MseLoss};
use crate::math::matrix::Matrix;

/// Selects the loss the model is trained against.
///
/// The output-layer error signal assumes a matched activation:
/// - `Mse`                     — Identity output.
/// - `Mae`                     — Identity output; signal is sign(ŷ - y).
/// - `BinaryCrossentropy`      — Sigmoid output.
/// - `CategoricalCrossentropy` — Softmax output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    Mse,
    Mae,
    BinaryCrossentropy,
    CategoricalCrossentropy,
}

impl LossKind {
    /// Scalar loss of `predicted` against `expected`, averaged over the batch (rows).
    /// Both matrices must have the same shape.
    pub fn loss(&self, expected: &Matrix, predicted: &Matrix) -> f64 {
        debug_assert_eq!(
            expected.shape(),
            predicted.shape(),
            "targets and predictions differ in shape"
        );
        match self {
            LossKind::Mse => MseLoss::loss(expected, predicted),
            LossKind::Mae => MaeLoss::loss(expected, predicted),
            LossKind::BinaryCrossentropy => BceLoss::loss(expected, predicted),
            LossKind::CategoricalCrossentropy => CrossEntropyLoss::loss(expected, predicted),
        }
    }

    /// Initial error signal dZ handed to the last layer's `backprop_output`.
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn output_delta(&self, expected: &Matrix, predicted: &Matrix) -> Matrix {
        match self {
            LossKind::Mse => MseLoss::delta(expected, predicted),
            LossKind::Mae => MaeLoss::delta(expected, predicted),
            LossKind::BinaryCrossentropy => BceLoss::delta(expected, predicted),
            LossKind::CategoricalCrossentropy => CrossEntropyLoss::delta(expected, predicted),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Mse => "mse",
            LossKind::Mae => "mae",
            LossKind::BinaryCrossentropy => "binary_crossentropy",
            LossKind::CategoricalCrossentropy => "categorical_crossentropy",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossKind {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mse" => Ok(LossKind::Mse),
            "mae" => Ok(LossKind::Mae),
            "binary_crossentropy" => Ok(LossKind::BinaryCrossentropy),
            "categorical_crossentropy" => Ok(LossKind::CategoricalCrossentropy),
            _ => Err(NnError::UnknownLoss(s.to_string())),
        }
    }
}
