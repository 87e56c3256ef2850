#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;
extern crate hal;
extern crate libm;
#[macro_use]
extern crate log;
extern crate nalgebra;
#[macro_use]
extern crate serde;
extern crate spin;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod algorithm;
pub mod config;
pub mod drivers;
pub mod error;
pub mod imu;
pub mod scale;
pub mod sync;
#[cfg(feature = "std")]
pub mod sys;
pub mod types;

pub use drivers::NineDOF;
pub use error::{Error, InvalidConfiguration};
pub use imu::Integrator;
pub use scale::AxisGroup;
