//! Reconciler
//!
//! Drives the canvas toward the goal map:
//! - `clear` deletes every occupied cell, best effort
//! - `replicate` clears, then creates every goal entity
//! - `create` / `delete` apply a single bounds-checked operation
//!
//! Batches run at most `parallel_degree` remote calls at a time and always
//! run to completion; a failed call never cancels its siblings.

use crate::client::{CanvasApi, Operation};
use crate::entity::{Entity, Position};
use crate::error::{CanvasError, RemoteError};
use crate::goal::GoalMap;
use crate::pattern;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Default bound on simultaneous remote calls
pub const DEFAULT_PARALLEL_DEGREE: usize = 3;

/// A call that failed terminally within a batch
#[derive(Debug)]
pub struct BatchFailure {
    /// Entity the call was made for
    pub entity: Entity,
    /// Terminal error
    pub error: RemoteError,
}

/// Outcome of a batch
#[derive(Debug)]
pub struct BatchReport {
    /// Operation applied by the batch
    pub operation: Operation,
    /// Calls dispatched
    pub attempted: usize,
    /// Calls that succeeded
    pub succeeded: usize,
    /// Calls that failed terminally
    pub failures: Vec<BatchFailure>,
    /// Why the batch never started, if it did not
    pub aborted: Option<String>,
}

impl BatchReport {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    fn aborted(operation: Operation, reason: String) -> Self {
        Self {
            aborted: Some(reason),
            ..Self::new(operation)
        }
    }

    /// Whether every dispatched call succeeded and the batch was not aborted
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }

    /// Turn failures into an error carrying the first one
    fn into_result(mut self) -> Result<Self, CanvasError> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let failed = self.failures.len();
        let first = self.failures.swap_remove(0);
        Err(CanvasError::Batch {
            operation: self.operation,
            failed,
            attempted: self.attempted,
            source: first.error,
        })
    }
}

/// Reconciles the remote canvas against a goal map snapshot
pub struct Reconciler {
    api: Arc<dyn CanvasApi>,
    goal: GoalMap,
    parallel_degree: usize,
}

impl Reconciler {
    /// Create reconciler for an already loaded goal map
    ///
    /// A `parallel_degree` of zero is raised to one.
    #[must_use]
    pub fn new(api: Arc<dyn CanvasApi>, goal: GoalMap, parallel_degree: usize) -> Self {
        Self {
            api,
            goal,
            parallel_degree: parallel_degree.max(1),
        }
    }

    /// Fetch the goal map and create a reconciler for it
    ///
    /// # Errors
    /// Any goal fetch or parse error; these abort the run.
    pub async fn bootstrap(
        api: Arc<dyn CanvasApi>,
        parallel_degree: usize,
    ) -> Result<Self, CanvasError> {
        let goal = api.fetch_goal().await?;
        Ok(Self::new(api, goal, parallel_degree))
    }

    /// Goal map snapshot
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &GoalMap {
        &self.goal
    }

    /// Bound on simultaneous remote calls
    #[inline]
    #[must_use]
    pub fn parallel_degree(&self) -> usize {
        self.parallel_degree
    }

    /// Create a single entity
    ///
    /// # Errors
    /// - `CanvasError::OutOfBounds` without any remote call
    /// - `CanvasError::Remote` if the call fails terminally
    pub async fn create(&self, entity: &Entity) -> Result<(), CanvasError> {
        self.goal.check_bounds(entity.position)?;
        self.api.apply(entity, Operation::Create).await?;
        Ok(())
    }

    /// Delete whatever occupies `position`
    ///
    /// # Errors
    /// - `CanvasError::OutOfBounds` without any remote call
    /// - `CanvasError::Remote` if the call fails terminally
    pub async fn delete(&self, position: Position) -> Result<(), CanvasError> {
        self.goal.check_bounds(position)?;
        self.api
            .apply(&Entity::delete_target(position), Operation::Delete)
            .await?;
        Ok(())
    }

    /// Delete every occupied cell of the current canvas.
    ///
    /// Never fails: fetch errors and failed deletes are logged and reported
    /// in the returned [`BatchReport`].
    pub async fn clear(&self) -> BatchReport {
        let content = match self.api.fetch_current_content().await {
            Ok(content) => content,
            Err(err) => {
                error!(error = %err, "could not fetch current canvas, nothing deleted");
                return BatchReport::aborted(Operation::Delete, err.to_string());
            }
        };

        let targets: Vec<Entity> = occupied_positions(&content)
            .map(Entity::delete_target)
            .collect();
        info!(occupied = targets.len(), "clearing canvas");

        let report = self.run_batch(targets, Operation::Delete).await;
        if report.failures.is_empty() {
            info!(deleted = report.succeeded, "canvas cleared");
        } else {
            error!(
                deleted = report.succeeded,
                failed = report.failures.len(),
                "canvas partially cleared"
            );
        }
        report
    }

    /// Clear the canvas, then create every goal entity
    ///
    /// # Errors
    /// `CanvasError::Batch` if any create failed terminally; reported after
    /// the whole create batch has finished.
    pub async fn replicate(&self) -> Result<BatchReport, CanvasError> {
        let cleared = self.clear().await;
        if !cleared.is_complete() {
            warn!("replicating over a canvas that was not fully cleared");
        }

        info!(entities = self.goal.entities().len(), "replicating goal map");
        let report = self.create_batch(self.goal.entities().to_vec()).await?;
        info!(created = report.succeeded, "goal map replicated");
        Ok(report)
    }

    /// Draw an X of polyanets across a square goal map, `margin` cells in
    /// from each corner. The canvas is not cleared first.
    ///
    /// # Errors
    /// - `CanvasError::NotSquare` for a non-square goal map
    /// - `CanvasError::Batch` if any create failed terminally
    pub async fn draw_x(&self, margin: usize) -> Result<BatchReport, CanvasError> {
        let entities = pattern::x_shape(&self.goal, margin)?;
        info!(margin, entities = entities.len(), "drawing X shape");
        self.create_batch(entities).await
    }

    /// Create all `entities` with bounded concurrency
    ///
    /// # Errors
    /// - `CanvasError::OutOfBounds` before any call if an entity is off the map
    /// - `CanvasError::Batch` if any create failed terminally
    pub async fn create_batch(&self, entities: Vec<Entity>) -> Result<BatchReport, CanvasError> {
        for entity in &entities {
            self.goal.check_bounds(entity.position)?;
        }
        self.run_batch(entities, Operation::Create)
            .await
            .into_result()
    }

    async fn run_batch(&self, entities: Vec<Entity>, operation: Operation) -> BatchReport {
        let mut report = BatchReport::new(operation);
        report.attempted = entities.len();
        if entities.is_empty() {
            return report;
        }

        info!(
            %operation,
            count = report.attempted,
            parallelism = self.parallel_degree,
            "dispatching batch"
        );

        let api = &self.api;
        let outcomes: Vec<(Entity, Result<(), RemoteError>)> = stream::iter(entities)
            .map(|entity| async move {
                let result = api.apply(&entity, operation).await;
                (entity, result)
            })
            .buffer_unordered(self.parallel_degree)
            .collect()
            .await;

        for (entity, result) in outcomes {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    error!(%operation, %entity, %error, "batch call failed");
                    report.failures.push(BatchFailure { entity, error });
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("goal", &self.goal)
            .field("parallel_degree", &self.parallel_degree)
            .finish_non_exhaustive()
    }
}

/// Positions of occupied cells, row-major
fn occupied_positions(content: &[Vec<bool>]) -> impl Iterator<Item = Position> + '_ {
    content.iter().enumerate().flat_map(|(row, cells)| {
        cells
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(move |(column, _)| Position::new(row, column))
    })
}
