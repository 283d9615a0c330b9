pub mod mse;
pub mod mae;
pub mod bce;
pub mod cross_entropy;
pub mod loss_type;

pub use mse::MseLoss;
pub use mae::MaeLoss;
pub use bce::BceLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossKind;
