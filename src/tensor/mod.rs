mod dense;
pub mod functional;
mod numeric;
mod types;

pub use dense::*;
pub use numeric::*;
pub use types::*;
