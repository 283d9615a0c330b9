use serde::{Serialize, Deserialize};
use std::f64::consts::E;

use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Identity,
    Sigmoid,
    Tanh,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
    /// Vector-valued; applied row by row in `apply()`, never element-wise.
    Softmax,
}

impl ActivationFunction {
    /// Element-wise activation. `Softmax` is handled by `apply()` and is the
    /// identity here.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity | ActivationFunction::Softmax => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Element-wise derivative evaluated at the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity | ActivationFunction::Softmax => 1.0,
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }

    /// Applies the activation to a whole batch of pre-activations.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => softmax_rows(z),
            _ => z.map(|x| self.function(x)),
        }
    }

    /// Maps ∂L/∂A to ∂L/∂Z given the cached pre-activations `z` and outputs `a`.
    pub fn backward(&self, z: &Matrix, a: &Matrix, grad: &Matrix) -> Matrix {
        match self {
            // dZ_i = s_i (dA_i - Σ_j dA_j s_j)
            ActivationFunction::Softmax => {
                let data = a
                    .data
                    .iter()
                    .zip(grad.data.iter())
                    .map(|(s, d)| {
                        let dot: f64 = s.iter().zip(d.iter()).map(|(s, d)| s * d).sum();
                        s.iter().zip(d.iter()).map(|(s, d)| s * (d - dot)).collect()
                    })
                    .collect();
                Matrix { rows: a.rows, cols: a.cols, data }
            }
            _ => grad.zip_map(z, |g, x| g * self.derivative(x)),
        }
    }
}

/// Row-wise softmax, shifted by the row maximum to keep exp() finite.
fn softmax_rows(z: &Matrix) -> Matrix {
    let data = z
        .data
        .iter()
        .map(|row| {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
            let total: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / total).collect()
        })
        .collect();
    Matrix { rows: z.rows, cols: z.cols, data }
}
