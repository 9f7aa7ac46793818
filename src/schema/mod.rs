//! Schema module - Configuration, design-space and result types.

mod config;
mod design;
mod evolution;

pub use config::*;
pub use design::*;
pub use evolution::*;
