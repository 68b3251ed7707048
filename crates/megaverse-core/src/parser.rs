//! Goal grid parser
//!
//! Turns the 2-D grid of type tags returned by the goal endpoint into
//! entities. Tags follow the API vocabulary: `SPACE`, `POLYANET`,
//! `<DIRECTION>_COMETH` and `<COLOR>_SOLOON`.

use crate::entity::{Color, Direction, Entity, EntityKind, Position};
use crate::error::CanvasError;

/// Tag of an empty cell
pub const SPACE: &str = "SPACE";

const POLYANET: &str = "POLYANET";
const COMETH_SUFFIX: &str = "_COMETH";
const SOLOON_SUFFIX: &str = "_SOLOON";

/// Parse a grid of type tags into entities, in row-major order.
///
/// # Errors
/// - `CanvasError::EmptyGrid` if the grid or its first row is empty
/// - `CanvasError::RaggedGrid` if a row's length differs from the first row's
/// - `CanvasError::UnknownType` for a tag outside the vocabulary
pub fn parse_grid<S: AsRef<str>>(grid: &[Vec<S>]) -> Result<Vec<Entity>, CanvasError> {
    let cols = grid.first().map_or(0, Vec::len);
    if cols == 0 {
        return Err(CanvasError::EmptyGrid);
    }

    let mut entities = Vec::new();
    for (row, cells) in grid.iter().enumerate() {
        if cells.len() != cols {
            return Err(CanvasError::RaggedGrid {
                row,
                expected: cols,
                found: cells.len(),
            });
        }

        for (column, tag) in cells.iter().enumerate() {
            if let Some(kind) = parse_tag(tag.as_ref())? {
                entities.push(Entity::new(Position::new(row, column), kind));
            }
        }
    }

    Ok(entities)
}

/// Parse a single tag. Returns `None` for [`SPACE`].
///
/// # Errors
/// `CanvasError::UnknownType` if the tag, or its embedded direction or
/// color, is not recognized.
pub fn parse_tag(tag: &str) -> Result<Option<EntityKind>, CanvasError> {
    if tag == SPACE {
        return Ok(None);
    }
    if tag == POLYANET {
        return Ok(Some(EntityKind::Polyanet));
    }

    let unknown = || CanvasError::UnknownType(tag.to_string());

    if let Some(token) = tag.strip_suffix(COMETH_SUFFIX) {
        let direction = token.parse::<Direction>().map_err(|_| unknown())?;
        return Ok(Some(EntityKind::Cometh { direction }));
    }
    if let Some(token) = tag.strip_suffix(SOLOON_SUFFIX) {
        let color = token.parse::<Color>().map_err(|_| unknown())?;
        return Ok(Some(EntityKind::Soloon { color }));
    }

    Err(unknown())
}
