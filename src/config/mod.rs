//! Batch configuration: shape validation and loading.

pub mod load;
pub mod validate;

pub use load::load_batch;
pub use validate::ValidationError;
