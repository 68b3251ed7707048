//! Geometric patterns derived from the goal map's dimensions

use crate::entity::{Entity, EntityKind, Position};
use crate::error::CanvasError;
use crate::goal::GoalMap;
use std::collections::HashSet;

/// Polyanets on both diagonals of a square goal map, skipping `margin`
/// cells at each end. The centre of an odd-sized map appears once.
///
/// # Errors
/// `CanvasError::NotSquare` if rows != cols.
pub fn x_shape(goal: &GoalMap, margin: usize) -> Result<Vec<Entity>, CanvasError> {
    if !goal.is_square() {
        return Err(CanvasError::NotSquare {
            rows: goal.rows(),
            cols: goal.cols(),
        });
    }

    let size = goal.rows();
    let mut seen = HashSet::new();
    let mut entities = Vec::new();

    for i in margin..size.saturating_sub(margin) {
        for position in [Position::new(i, i), Position::new(i, size - 1 - i)] {
            if seen.insert(position) {
                entities.push(Entity::new(position, EntityKind::Polyanet));
            }
        }
    }

    Ok(entities)
}
