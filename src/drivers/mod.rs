pub mod ak8963;
#[cfg(test)]
pub(crate) mod fake;
pub mod i2c;
pub mod mpu9250;
mod nine_dof;

pub use nine_dof::NineDOF;
