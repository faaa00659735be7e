pub mod core;

pub use core::{load_from, load_or_create_config, GlooConfig};
