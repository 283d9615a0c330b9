pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod regularization;
pub mod loss;
pub mod optim;
pub mod normalize;
pub mod metrics;
pub mod network;
pub mod train;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::{Dense, Dropout, Initializer, Layer};
pub use regularization::Regularizer;
pub use loss::LossKind;
pub use optim::sgd::Sgd;
pub use normalize::{NormalizationKind, Normalizer};
pub use metrics::{MetricKind, Metrics, Score};
pub use network::{BuildConfig, LayerSpec, ModelSpec, Sequential};
pub use train::{EpochStats, TrainConfig};
