//! Monitoring Module
//!
//! Tracks per-workflow generation timing.
//!
//! # Components
//!
//! - [`GenerationTimeline`]: Workflow start/end events and durations

pub mod timeline;

pub use timeline::{EventType, GenerationTimeline, TimelineEvent};
