pub mod error;

pub use error::{GlooError, Result};
