//! Generation Timeline
//!
//! Records when each workflow's artifact generation starts and ends.
//! Used for the run summary and the `--verbose` timing chart.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Started,
    Completed,
    Failed,
}

/// A single event in the timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub workflow_id: String,
    pub event_type: EventType,
    pub timestamp: Instant,
}

/// Per-workflow generation events, in the order they were recorded.
#[derive(Debug, Clone)]
pub struct GenerationTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl GenerationTimeline {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record(&mut self, workflow_id: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            workflow_id: workflow_id.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of workflows that reached the given terminal state.
    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Time between start and completion (or failure) per workflow.
    ///
    /// Workflows that never finished are left out.
    pub fn durations(&self) -> BTreeMap<String, Duration> {
        let mut starts: BTreeMap<&str, Instant> = BTreeMap::new();
        let mut durations = BTreeMap::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => {
                    starts.insert(&event.workflow_id, event.timestamp);
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(start) = starts.get(event.workflow_id.as_str()) {
                        durations.insert(
                            event.workflow_id.clone(),
                            event.timestamp.duration_since(*start),
                        );
                    }
                }
            }
        }

        durations
    }

    /// Renders one line per finished workflow with its status and duration,
    /// in the order workflows finished.
    pub fn report(&self) -> String {
        let durations = self.durations();
        let mut output = String::from("Generation timeline:\n");

        for event in &self.events {
            let status = match event.event_type {
                EventType::Started => continue,
                EventType::Completed => "ok",
                EventType::Failed => "FAILED",
            };
            let micros = durations
                .get(&event.workflow_id)
                .map_or(0, Duration::as_micros);
            output.push_str(&format!(
                "  {:<24} {:>6} {:>8} us\n",
                truncate(&event.workflow_id, 24),
                status,
                micros
            ));
        }

        output.push_str(&format!("Total: {} ms\n", self.elapsed().as_millis()));
        output
    }
}

impl Default for GenerationTimeline {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
