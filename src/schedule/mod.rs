pub mod clock;
pub mod selector;

pub use clock::{Clock, ClockTime, FixedClock, LocalClock, ScheduleError};
pub use selector::{select_active, window, DEFAULT_END, DEFAULT_START};
