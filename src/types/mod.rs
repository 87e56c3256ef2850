pub mod euler;
pub mod sensor;

pub use euler::Euler;
pub use sensor::{Axes, Bias, Sensitivity};
