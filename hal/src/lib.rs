#![no_std]

pub mod bus;
pub mod clock;
