pub mod build_config;
pub mod sequential;
pub mod spec;

pub use build_config::BuildConfig;
pub use sequential::Sequential;
pub use spec::{LayerSpec, ModelSpec};
