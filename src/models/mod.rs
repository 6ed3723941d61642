//! Data models

pub mod stat_event;
pub mod detection;

pub use stat_event::*;
pub use detection::*;
