use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NnError, Result};
use crate::layers::layer::Layer;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Sgd;
use crate::regularization::Regularizer;

/// Weight initialization scheme. Biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// N(0, sqrt(1 / fan_in)); suits Sigmoid/Tanh/Identity.
    #[default]
    Xavier,
    /// N(0, sqrt(2 / fan_in)); suits ReLU.
    He,
    /// U(-1, 1).
    Uniform,
}

impl Initializer {
    fn sample<R: Rng + ?Sized>(&self, fan_in: usize, units: usize, rng: &mut R) -> Matrix {
        match self {
            Initializer::Xavier => Matrix::xavier(fan_in, units, rng),
            Initializer::He => Matrix::he(fan_in, units, rng),
            Initializer::Uniform => Matrix::uniform(fan_in, units, rng),
        }
    }
}

#[derive(Debug)]
struct ForwardCache {
    input: Matrix,
    z: Matrix,
    a: Matrix,
}

#[derive(Debug)]
struct Gradients {
    weights: Matrix,
    biases: Matrix,
}

/// Fully connected layer: `A = g(X·W + b)`.
#[derive(Debug)]
pub struct Dense {
    id: Option<usize>,
    pub units: usize,
    input_width: Option<usize>,
    pub activation: ActivationFunction,
    regularizer: Option<Regularizer>,
    initializer: Initializer,
    seed: Option<u64>,
    pub weights: Matrix,
    pub biases: Matrix,
    optimizer: Option<Sgd>,
    cache: Option<ForwardCache>,
    grads: Option<Gradients>,
}

impl Dense {
    pub fn new(units: usize, activation: ActivationFunction) -> Dense {
        Dense {
            id: None,
            units,
            input_width: None,
            activation,
            regularizer: None,
            initializer: Initializer::default(),
            seed: None,
            weights: Matrix::default(),
            biases: Matrix::default(),
            optimizer: None,
            cache: None,
            grads: None,
        }
    }

    pub fn with_input_width(mut self, input_width: usize) -> Dense {
        self.input_width = Some(input_width);
        self
    }

    pub fn with_regularizer(mut self, regularizer: Regularizer) -> Dense {
        self.regularizer = Some(regularizer);
        self
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Dense {
        self.initializer = initializer;
        self
    }

    /// Makes weight initialization reproducible.
    pub fn with_seed(mut self, seed: u64) -> Dense {
        self.seed = Some(seed);
        self
    }

    pub fn learning_rate(&self) -> Option<f64> {
        self.optimizer.map(|o| o.learning_rate)
    }

    fn transform(&self, input: &Matrix) -> (Matrix, Matrix) {
        let z = input.dot(&self.weights).add_row(&self.biases);
        let a = self.activation.apply(&z);
        (z, a)
    }

    /// Shared tail of both backward entry points. `dz` is ∂L/∂Z.
    fn stage_gradients(&mut self, dz: Matrix, cache: ForwardCache) -> Result<Matrix> {
        if dz.shape() != cache.z.shape() {
            return Err(NnError::ShapeMismatch {
                what: "dense backprop signal",
                expected: cache.z.shape(),
                got: dz.shape(),
            });
        }
        let m = cache.input.rows.max(1);
        let inv_m = 1.0 / m as f64;

        let mut weights_grad = cache.input.transpose().dot(&dz).scale(inv_m);
        if let Some(regularizer) = &self.regularizer {
            weights_grad = &weights_grad + &regularizer.gradient(&self.weights, m);
        }
        let biases_grad = dz.sum_rows().scale(inv_m);

        // Uses the weights of this step, before `update` touches them.
        let input_grad = dz.dot(&self.weights.transpose());

        self.grads = Some(Gradients { weights: weights_grad, biases: biases_grad });
        Ok(input_grad)
    }

    fn take_cache(&mut self) -> Result<ForwardCache> {
        self.cache.take().ok_or_else(|| {
            NnError::State(format!("dense layer {:?}: backprop without a preceding forwardprop", self.id))
        })
    }
}

impl Layer for Dense {
    fn name(&self) -> &'static str {
        "dense"
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
            return Err(NnError::Contract(format!("dense layer {} initialized twice", id)));
        }
        if self.units == 0 || input_width == 0 {
            return Err(NnError::Contract(format!(
                "dense layer {} needs non-zero widths, got {} -> {}",
                id, input_width, self.units
            )));
        }

        self.weights = match self.seed {
            Some(seed) => self.initializer.sample(input_width, self.units, &mut StdRng::seed_from_u64(seed)),
            None => self.initializer.sample(input_width, self.units, &mut rand::thread_rng()),
        };
        self.biases = Matrix::zeros(1, self.units);
        self.input_width = Some(input_width);
        self.id = Some(id);

        debug!("dense layer {id}: {input_width} -> {} ({:?})", self.units, self.activation);
        Ok(())
    }

    fn set_optimizer(&mut self, optimizer: Sgd) {
        self.optimizer = Some(optimizer);
    }

    fn predict(&self, input: &Matrix) -> Matrix {
        self.transform(input).1
    }

    fn forwardprop(&mut self, input: &Matrix) -> Matrix {
        let (z, a) = self.transform(input);
        self.cache = Some(ForwardCache { input: input.clone(), z, a: a.clone() });
        a
    }

    fn backprop(&mut self, grad: &Matrix) -> Result<Matrix> {
        let cache = self.take_cache()?;
        if grad.shape() != cache.a.shape() {
            return Err(NnError::ShapeMismatch {
                what: "dense backprop gradient",
                expected: cache.a.shape(),
                got: grad.shape(),
            });
        }
        let dz = self.activation.backward(&cache.z, &cache.a, grad);
        self.stage_gradients(dz, cache)
    }

    fn backprop_output(&mut self, delta: &Matrix) -> Result<Matrix> {
        let cache = self.take_cache()?;
        self.stage_gradients(delta.clone(), cache)
    }

    fn update(&mut self) -> Result<()> {
        let optimizer = self.optimizer.ok_or_else(|| {
            NnError::State(format!("dense layer {:?}: no optimizer; build the model first", self.id))
        })?;
        let grads = self.grads.take().ok_or_else(|| {
            NnError::State(format!("dense layer {:?}: update without a preceding backprop", self.id))
        })?;
        optimizer.step(&mut self.weights, &grads.weights);
        optimizer.step(&mut self.biases, &grads.biases);
        Ok(())
    }

    fn regularizer(&self) -> Option<(&Regularizer, &Matrix)> {
        self.regularizer.as_ref().map(|r| (r, &self.weights))
    }
}
