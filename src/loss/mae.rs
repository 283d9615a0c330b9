use crate::math::matrix::Matrix;

pub struct MaeLoss;

impl MaeLoss {
    /// Scalar MAE: (1/m) · Σ |y - ŷ|
    pub fn loss(expected: &Matrix, predicted: &Matrix) -> f64 {
        let m = expected.rows;
        if m == 0 {
            return 0.0;
        }
        expected.iter().zip(predicted.iter())
            .map(|(y, p)| (y - p).abs())
            .sum::<f64>() / m as f64
    }

    /// Output-layer error signal: sign(ŷ - y), exactly 0 where they are equal.
    pub fn delta(expected: &Matrix, predicted: &Matrix) -> Matrix {
        predicted.zip_map(expected, |p, y| sign(p - y))
    }
}

/// Unlike `f64::signum`, returns 0 for ±0.
pub(crate) fn sign(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else if x < 0.0 { -1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mae_loss() {
        let y = Matrix::column(&[1.0, -1.0, 0.0, 2.0]);
        let p = Matrix::column(&[2.0, 1.0, 0.0, 2.0]);
        assert_abs_diff_eq!(MaeLoss::loss(&y, &p), 0.75);
    }

    #[test]
    fn test_mae_delta_is_zero_on_exact_match() {
        let y = Matrix::column(&[1.0, 1.0, 1.0]);
        let p = Matrix::column(&[1.5, 1.0, 0.5]);
        assert_eq!(MaeLoss::delta(&y, &p).data, vec![vec![1.0], vec![0.0], vec![-1.0]]);
        assert_eq!(sign(-0.0), 0.0);
    }
}
