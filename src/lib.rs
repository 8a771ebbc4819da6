pub mod config;
pub mod dataset;
pub mod driver;
mod error;
pub mod nn;
pub mod optim;
pub mod runtime;
pub mod tensor;

pub use error::{Error, Result};
