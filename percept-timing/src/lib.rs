pub mod deadline;
pub mod timer;
pub mod wall;

pub use deadline::Deadline;
pub use timer::{MonotonicTimer, Timer};
pub use wall::{WallClock, WallStamp};
