pub mod time;

pub use time::{StdClock, StdDelay};
