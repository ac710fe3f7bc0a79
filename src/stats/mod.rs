//! Sliding-window statistics: the bucket ring and the latency aggregate built on it.

pub mod avg;
pub mod leap_array;

pub use avg::{aggregate, AvgStatsEntry, AvgStatsWindow, StatsResult};
pub use leap_array::{LeapArray, LeapArrayListener, LeapBucket, WindowWrap};
