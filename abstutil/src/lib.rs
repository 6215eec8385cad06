//! Small utilities shared by the rest of the workspace: logging setup, a hierarchical timer for
//! generation phases, and a priority queue item for `BinaryHeap`s.

#[macro_use]
extern crate log;

mod collections;
pub mod logger;
mod priority_queue;
mod time;
mod utils;

pub use crate::collections::wraparound_get;
pub use crate::priority_queue::PriorityQueueItem;
pub use crate::time::Timer;
pub use crate::utils::{prettyprint_time, prettyprint_usize};
