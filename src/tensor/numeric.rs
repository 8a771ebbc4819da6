pub use num::{Float, One, Zero};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::PartialEq;

pub use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Element type of every tensor the runtime touches.
///
/// Gradients and means need real division, so only floating point types qualify.
pub trait Numeric:
    Float
    + AddAssign
    + PartialEq
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + std::fmt::Debug
    + std::fmt::Display
    + 'static
{
    /// Lossy conversion used for learning rates and initializer parameters.
    fn from_f64(value: f64) -> Self;
}
// https://stackoverflow.com/questions/42381185/specifying-generic-parameter-to-belong-to-a-small-set-of-types
macro_rules! numeric_impl {
    ($($t: ty),+) => {
        $(
            impl Numeric for $t {
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )+
    }
}

numeric_impl!(f32, f64);
