use crate::math::matrix::Matrix;

pub struct BceLoss;

/// Predictions are clipped to [EPS, 1 - EPS] before any logarithm.
pub const EPS: f64 = 1e-15;

impl BceLoss {
    /// Scalar BCE: -(1/m) · Σ [y·log(ŷ) + (1-y)·log(1-ŷ)]
    pub fn loss(expected: &Matrix, predicted: &Matrix) -> f64 {
        let m = expected.rows;
        if m == 0 {
            return 0.0;
        }
        -expected.iter().zip(predicted.iter())
            .map(|(y, p)| {
                let p = clip(*p);
                y * p.ln() + (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>() / m as f64
    }

    /// Output-layer error signal for a sigmoid output: ŷ - y
    pub fn delta(expected: &Matrix, predicted: &Matrix) -> Matrix {
        predicted - expected
    }
}

pub(crate) fn clip(p: f64) -> f64 {
    p.clamp(EPS, 1.0 - EPS)
}
