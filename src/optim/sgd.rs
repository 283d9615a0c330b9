use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Plain gradient descent. Handed to every layer by value when the model is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// One descent step: `param -= learning_rate * grad`.
    pub fn step(&self, param: &mut Matrix, grad: &Matrix) {
        let lr = self.learning_rate;
        *param = param.zip_map(grad, |p, g| p - lr * g);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut w = Matrix::from_data(vec![vec![1.0, -1.0]]).unwrap();
        let g = Matrix::from_data(vec![vec![2.0, -4.0]]).unwrap();
        Sgd::new(0.5).step(&mut w, &g);
        assert_eq!(w.data, vec![vec![0.0, 1.0]]);
    }
}
