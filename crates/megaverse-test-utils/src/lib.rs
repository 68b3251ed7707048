//! Testing utilities for the Megaverse workspace
//!
//! Shared fixtures and an in-memory [`CanvasApi`] that records calls.

#![allow(missing_docs)]

use megaverse_core::{
    CanvasApi, CanvasConfig, CanvasError, Entity, GoalMap, Operation, Position, RemoteError,
    StatusCode,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The 3x3 cross used throughout the tests
pub fn cross_goal_grid() -> Vec<Vec<String>> {
    grid(&[
        &["SPACE", "POLYANET", "SPACE"],
        &["POLYANET", "SPACE", "POLYANET"],
        &["SPACE", "POLYANET", "SPACE"],
    ])
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|tag| (*tag).to_string()).collect())
        .collect()
}

/// Occupancy matching a tag grid: every non-`SPACE` cell is occupied
pub fn occupancy(tags: &[Vec<String>]) -> Vec<Vec<bool>> {
    tags.iter()
        .map(|row| row.iter().map(|tag| tag != "SPACE").collect())
        .collect()
}

/// Configuration pointing at `base_url` with no pacing or backoff
pub fn test_config(base_url: &str) -> CanvasConfig {
    CanvasConfig::new()
        .with_base_url(base_url)
        .with_candidate_id("test-candidate-id")
        .with_parallel_degree(2)
        .with_retry(3, Duration::ZERO, 0.0)
        .with_request_delay(Duration::ZERO)
}

/// A call received by [`FakeCanvas`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub entity: Entity,
}

/// In-memory canvas
#[derive(Debug)]
pub struct FakeCanvas {
    goal_grid: Vec<Vec<String>>,
    content: Option<Vec<Vec<bool>>>,
    failing: HashMap<(Operation, Position), StatusCode>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    reads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeCanvas {
    /// Canvas whose goal is `goal_grid` and whose current content is empty
    pub fn new(goal_grid: Vec<Vec<String>>) -> Self {
        let content = goal_grid
            .iter()
            .map(|row| vec![false; row.len()])
            .collect();
        Self {
            goal_grid,
            content: Some(content),
            failing: HashMap::new(),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// With current content
    #[must_use]
    pub fn with_content(mut self, content: Vec<Vec<bool>>) -> Self {
        self.content = Some(content);
        self
    }

    /// Current content fetch fails as malformed
    #[must_use]
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }

    /// `operation` at `position` fails terminally with `status`
    #[must_use]
    pub fn failing_at(mut self, operation: Operation, position: Position, status: StatusCode) -> Self {
        self.failing.insert((operation, position), status);
        self
    }

    /// Every apply call takes `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Apply calls in dispatch order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Apply calls for one operation
    pub fn calls_for(&self, operation: Operation) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation)
            .copied()
            .collect()
    }

    /// Goal and content fetches
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous apply calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CanvasApi for FakeCanvas {
    async fn fetch_goal(&self) -> Result<GoalMap, CanvasError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        GoalMap::from_grid(&self.goal_grid)
    }

    async fn fetch_current_content(&self) -> Result<Vec<Vec<bool>>, CanvasError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.content
            .clone()
            .ok_or_else(|| CanvasError::MalformedResponse("map has no 'content' field".to_string()))
    }

    async fn apply(&self, entity: &Entity, operation: Operation) -> Result<(), RemoteError> {
        self.calls.lock().push(RecordedCall {
            operation,
            entity: *entity,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failing.get(&(operation, entity.position)) {
            Some(status) => Err(RemoteError::status(*status, "injected failure")),
            None => Ok(()),
        }
    }
}
