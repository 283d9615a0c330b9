use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{NnError, Result};
use crate::layers::layer::Layer;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Sgd;

/// Inverted dropout. Each activation is zeroed with probability `rate` during
/// training and the survivors are scaled by `1 / (1 - rate)`; inference is the
/// identity. The layer has no parameters and keeps the width of its input.
#[derive(Debug)]
pub struct Dropout {
    id: Option<usize>,
    pub rate: f64,
    input_width: Option<usize>,
    units: usize,
    rng: StdRng,
    mask: Option<Matrix>,
    pending_update: bool,
}

impl Dropout {
    pub fn new(rate: f64) -> Dropout {
        Dropout {
            id: None,
            rate,
            input_width: None,
            units: 0,
            rng: StdRng::from_entropy(),
            mask: None,
            pending_update: false,
        }
    }

    pub fn with_input_width(mut self, input_width: usize) -> Dropout {
        self.input_width = Some(input_width);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Dropout {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn apply_mask(&mut self, grad: &Matrix) -> Result<Matrix> {
        let mask = self.mask.take().ok_or_else(|| {
            NnError::State(format!("dropout layer {:?}: backprop without a preceding forwardprop", self.id))
        })?;
        if mask.shape() != grad.shape() {
            return Err(NnError::ShapeMismatch {
                what: "dropout backprop gradient",
                expected: mask.shape(),
                got: grad.shape(),
            });
        }
        self.pending_update = true;
        Ok(grad.hadamard(&mask))
    }
}

impl Layer for Dropout {
    fn name(&self) -> &'static str {
        "dropout"
    }

    fn id(&self) -> Option<usize> {
        self.id
    }

    fn declared_input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn units(&self) -> usize {
        self.units
    }

    fn init(&mut self, id: usize, input_width: usize) -> Result<()> {
        if self.id.is_some() {
            return Err(NnError::Contract(format!("dropout layer {} initialized twice", id)));
        }
        if !(0.0..1.0).contains(&self.rate) {
            return Err(NnError::Contract(format!(
                "dropout layer {} rate must be in [0, 1), got {}",
                id, self.rate
            )));
        }
        self.id = Some(id);
        self.input_width = Some(input_width);
        self.units = input_width;
        debug!("dropout layer {id}: width {input_width}, rate {}", self.rate);
        Ok(())
    }

    fn set_optimizer(&mut self, _optimizer: Sgd) {}

    fn predict(&self, input: &Matrix) -> Matrix {
        input.clone()
    }

    fn forwardprop(&mut self, input: &Matrix) -> Matrix {
        let keep = 1.0 - self.rate;
        let scale = 1.0 / keep;
        let mut mask = Matrix::zeros(input.rows, input.cols);
        for x in mask.data.iter_mut().flatten() {
            *x = if self.rng.gen::<f64>() < keep { scale } else { 0.0 };
        }
        let out = input.hadamard(&mask);
        self.mask = Some(mask);
        out
    }

    fn backprop(&mut self, grad: &Matrix) -> Result<Matrix> {
        self.apply_mask(grad)
    }

    fn backprop_output(&mut self, delta: &Matrix) -> Result<Matrix> {
        self.apply_mask(delta)
    }

    fn update(&mut self) -> Result<()> {
        if !self.pending_update {
            return Err(NnError::State(format!(
                "dropout layer {:?}: update without a preceding backprop",
                self.id
            )));
        }
        self.pending_update = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_is_identity() {
        let mut dropout = Dropout::new(0.5).with_seed(1);
        dropout.init(0, 3).unwrap();
        let x = Matrix::from_data(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(dropout.predict(&x), x);
        assert_eq!(dropout.units(), 3);
    }

    #[test]
    fn test_mask_is_reused_by_backprop() {
        let mut dropout = Dropout::new(0.5).with_seed(9);
        dropout.init(1, 4).unwrap();
        let x = Matrix::from_data(vec![vec![1.0; 4]; 8]).unwrap();
        let out = dropout.forwardprop(&x);
        assert!(out.iter().all(|&v| v == 0.0 || v == 2.0));

        let grad = dropout.backprop(&x).unwrap();
        assert_eq!(grad, out);
        dropout.update().unwrap();
        assert!(dropout.update().unwrap_err().is_state());
    }

    #[test]
    fn test_rate_out_of_range_is_contract_error() {
        let mut dropout = Dropout::new(1.0);
        assert!(dropout.init(0, 2).unwrap_err().is_contract());
    }
}
