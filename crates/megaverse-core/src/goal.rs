//! Goal map snapshot

use crate::entity::{Entity, EntityKind, Position};
use crate::error::CanvasError;
use crate::parser::parse_grid;
use serde::Serialize;

/// Desired final arrangement of the canvas.
///
/// Built once per run from the goal endpoint and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalMap {
    rows: usize,
    cols: usize,
    entities: Vec<Entity>,
}

impl GoalMap {
    /// Create goal map from dimensions and entities
    ///
    /// # Errors
    /// - `CanvasError::EmptyGrid` if either dimension is zero
    /// - `CanvasError::OutOfBounds` if an entity lies outside the dimensions
    pub fn new(rows: usize, cols: usize, entities: Vec<Entity>) -> Result<Self, CanvasError> {
        if rows == 0 || cols == 0 {
            return Err(CanvasError::EmptyGrid);
        }

        let map = Self {
            rows,
            cols,
            entities: Vec::new(),
        };
        for entity in &entities {
            map.check_bounds(entity.position)?;
        }

        Ok(Self { entities, ..map })
    }

    /// Build from a grid of type tags
    ///
    /// # Errors
    /// Propagates parser errors (see [`parse_grid`]).
    pub fn from_grid<S: AsRef<str>>(grid: &[Vec<S>]) -> Result<Self, CanvasError> {
        let entities = parse_grid(grid)?;
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        Self::new(rows, cols, entities)
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Entities to place, in row-major order
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Whether rows == cols
    #[inline]
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Whether `position` lies on the map
    #[inline]
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.rows && position.column < self.cols
    }

    /// Reject positions outside the map
    ///
    /// # Errors
    /// `CanvasError::OutOfBounds` if `position` is not on the map.
    pub fn check_bounds(&self, position: Position) -> Result<(), CanvasError> {
        if self.contains(position) {
            Ok(())
        } else {
            Err(CanvasError::OutOfBounds {
                position,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// Entity counts by kind
    #[must_use]
    pub fn summary(&self) -> GoalSummary {
        let mut summary = GoalSummary {
            rows: self.rows,
            cols: self.cols,
            ..GoalSummary::default()
        };
        for entity in &self.entities {
            match entity.kind {
                EntityKind::Polyanet => summary.polyanets += 1,
                EntityKind::Cometh { .. } => summary.comeths += 1,
                EntityKind::Soloon { .. } => summary.soloons += 1,
            }
        }
        summary
    }
}

/// Goal map dimensions and entity counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoalSummary {
    pub rows: usize,
    pub cols: usize,
    pub polyanets: usize,
    pub comeths: usize,
    pub soloons: usize,
}

impl GoalSummary {
    /// Total number of entities
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.polyanets + self.comeths + self.soloons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Color, Direction};

    fn cross() -> Vec<Vec<&'static str>> {
        vec![
            vec!["SPACE", "POLYANET", "SPACE"],
            vec!["POLYANET", "SPACE", "POLYANET"],
            vec!["SPACE", "POLYANET", "SPACE"],
        ]
    }

    #[test]
    fn from_grid_takes_dimensions_from_grid() {
        let goal = GoalMap::from_grid(&cross()).unwrap();

        assert_eq!(goal.rows(), 3);
        assert_eq!(goal.cols(), 3);
        assert!(goal.is_square());
        assert_eq!(
            goal.entities(),
            &[
                Entity::polyanet(0, 1),
                Entity::polyanet(1, 0),
                Entity::polyanet(1, 2),
                Entity::polyanet(2, 1),
            ]
        );
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            GoalMap::new(0, 3, Vec::new()),
            Err(CanvasError::EmptyGrid)
        ));
    }

    #[test]
    fn entities_outside_dimensions_are_rejected() {
        let result = GoalMap::new(2, 2, vec![Entity::polyanet(2, 0)]);
        assert!(matches!(result, Err(CanvasError::OutOfBounds { .. })));
    }

    #[test]
    fn check_bounds() {
        let goal = GoalMap::new(10, 10, vec![Entity::polyanet(0, 0)]).unwrap();

        assert!(goal.check_bounds(Position::new(9, 9)).is_ok());
        assert!(goal.check_bounds(Position::new(20, 5)).is_err());
        assert!(goal.check_bounds(Position::new(5, 10)).is_err());
    }

    #[test]
    fn summary_counts_by_kind() {
        let goal = GoalMap::new(
            2,
            3,
            vec![
                Entity::polyanet(0, 0),
                Entity::cometh(0, 1, Direction::Right),
                Entity::soloon(1, 2, Color::White),
                Entity::soloon(1, 1, Color::Red),
            ],
        )
        .unwrap();

        let summary = goal.summary();
        assert_eq!(summary.polyanets, 1);
        assert_eq!(summary.comeths, 1);
        assert_eq!(summary.soloons, 2);
        assert_eq!(summary.total(), 4);
        assert!(!goal.is_square());
    }
}
