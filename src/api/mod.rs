pub mod monitor;

pub use monitor::{CycleReport, Monitor, SkipReason};
