use thiserror::Error;

/// Every error the training engine can report.
///
/// Variants fall into three families: contract violations by a layer,
/// configuration mistakes caught before any epoch runs, and state errors
/// raised when a layer is driven out of its forward/backward/update order.
#[derive(Debug, Error)]
pub enum NnError {
    #[error("layer contract violated: {0}")]
    Contract(String),

    #[error("unknown layer kind '{0}'")]
    UnknownLayer(String),

    #[error("the first layer must declare an explicit input width")]
    MissingInputWidth,

    #[error("model has not been built; call build() before training or evaluating")]
    NotBuilt,

    #[error("model has already been built")]
    AlreadyBuilt,

    #[error("no loss function configured")]
    MissingLoss,

    #[error("unknown loss '{0}' (expected mse, mae, binary_crossentropy or categorical_crossentropy)")]
    UnknownLoss(String),

    #[error("unknown normalization '{0}' (expected none, standard, zscore or minmax)")]
    UnknownNormalization(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid layer state: {0}")]
    State(String),

    #[error("shape mismatch in {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NnError {
    /// True for configuration errors (bad hyperparameters, missing build, ...).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            NnError::MissingInputWidth
                | NnError::NotBuilt
                | NnError::AlreadyBuilt
                | NnError::MissingLoss
                | NnError::UnknownLoss(_)
                | NnError::UnknownNormalization(_)
                | NnError::UnknownMetric(_)
                | NnError::InvalidConfig(_)
        )
    }

    /// True when a layer (or a layer description) does not satisfy the layer contract.
    pub fn is_contract(&self) -> bool {
        matches!(self, NnError::Contract(_) | NnError::UnknownLayer(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, NnError::State(_))
    }
}

pub type Result<T> = std::result::Result<T, NnError>;
