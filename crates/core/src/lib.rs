#![forbid(unsafe_code)]

pub mod clock_offset;
pub mod model;
pub mod progress;
pub mod slots;
pub mod time;

pub use clock_offset::{ClockOffset, ServerClock};
pub use time::Clock;
