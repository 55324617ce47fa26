//! Configuration management for the coordinator: the deployment descriptor and runtime options.

mod loader;
mod types;

pub use loader::*;
pub use types::*;
