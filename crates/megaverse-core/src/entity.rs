//! Canvas entities
//!
//! Every object placed on the canvas has a grid position and one of three
//! kinds. Each kind maps to its own API resource and contributes at most one
//! extra field to the request body.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Grid coordinate `(row, column)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Zero-based row
    pub row: usize,
    /// Zero-based column
    pub column: usize,
}

impl Position {
    /// Create new position
    #[inline]
    #[must_use]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Token that is not part of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {token}")]
pub struct UnknownTokenError {
    /// Enumeration that rejected the token
    pub kind: &'static str,
    /// Offending token
    pub token: String,
}

/// Direction a cometh travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in API order
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Token sent to the API
    #[inline]
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl FromStr for Direction {
    type Err = UnknownTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_api_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTokenError {
                kind: "cometh direction",
                token: s.to_string(),
            })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Color of a soloon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Blue,
    Red,
    Purple,
}

impl Color {
    /// All colors, in API order
    pub const ALL: [Self; 4] = [Self::White, Self::Blue, Self::Red, Self::Purple];

    /// Token sent to the API
    #[inline]
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Purple => "purple",
        }
    }
}

impl FromStr for Color {
    type Err = UnknownTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_api_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTokenError {
                kind: "soloon color",
                token: s.to_string(),
            })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Variant of a canvas entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Plain point
    Polyanet,
    /// Directed marker
    Cometh { direction: Direction },
    /// Colored marker
    Soloon { color: Color },
}

impl EntityKind {
    /// API resource path for this kind
    #[inline]
    #[must_use]
    pub fn resource_path(&self) -> &'static str {
        match self {
            Self::Polyanet => "/polyanets",
            Self::Cometh { .. } => "/comeths",
            Self::Soloon { .. } => "/soloons",
        }
    }

    /// Short name, as used in log lines
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Polyanet => "polyanet",
            Self::Cometh { .. } => "cometh",
            Self::Soloon { .. } => "soloon",
        }
    }
}

/// An object placed on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Grid position
    pub position: Position,
    /// Variant and its payload
    pub kind: EntityKind,
}

impl Entity {
    /// Create new entity
    #[inline]
    #[must_use]
    pub const fn new(position: Position, kind: EntityKind) -> Self {
        Self { position, kind }
    }

    /// Polyanet at `(row, column)`
    #[inline]
    #[must_use]
    pub const fn polyanet(row: usize, column: usize) -> Self {
        Self::new(Position::new(row, column), EntityKind::Polyanet)
    }

    /// Cometh at `(row, column)` heading `direction`
    #[inline]
    #[must_use]
    pub const fn cometh(row: usize, column: usize, direction: Direction) -> Self {
        Self::new(Position::new(row, column), EntityKind::Cometh { direction })
    }

    /// Soloon at `(row, column)` colored `color`
    #[inline]
    #[must_use]
    pub const fn soloon(row: usize, column: usize, color: Color) -> Self {
        Self::new(Position::new(row, column), EntityKind::Soloon { color })
    }

    /// Target for deleting whatever occupies `position`.
    ///
    /// The API keys deletion by position, so any resource path works; the
    /// polyanet one is used.
    #[inline]
    #[must_use]
    pub const fn delete_target(position: Position) -> Self {
        Self::new(position, EntityKind::Polyanet)
    }

    /// API resource path
    #[inline]
    #[must_use]
    pub fn resource_path(&self) -> &'static str {
        self.kind.resource_path()
    }

    /// Request body for create and delete calls
    #[must_use]
    pub fn request_body<'a>(&self, candidate_id: &'a str) -> RequestBody<'a> {
        let (direction, color) = match self.kind {
            EntityKind::Polyanet => (None, None),
            EntityKind::Cometh { direction } => (Some(direction), None),
            EntityKind::Soloon { color } => (None, Some(color)),
        };
        RequestBody {
            row: self.position.row,
            column: self.position.column,
            candidate_id,
            direction,
            color,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntityKind::Polyanet => {}
            EntityKind::Cometh { direction } => write!(f, "{direction} ")?,
            EntityKind::Soloon { color } => write!(f, "{color} ")?,
        }
        write!(f, "{} at {}", self.kind.name(), self.position)
    }
}

/// JSON body of a create or delete call
///
/// `direction` and `color` are omitted unless the entity carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody<'a> {
    pub row: usize,
    pub column: usize,
    pub candidate_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn body_json(entity: Entity) -> Value {
        serde_json::to_value(entity.request_body("candidate")).unwrap()
    }

    #[test]
    fn direction_round_trip() {
        for direction in Direction::ALL {
            assert_eq!(direction.as_api_str().parse::<Direction>(), Ok(direction));
        }
        assert_eq!("UP".parse::<Direction>(), Ok(Direction::Up));
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn color_round_trip() {
        for color in Color::ALL {
            assert_eq!(color.as_api_str().parse::<Color>(), Ok(color));
        }
        assert_eq!("Purple".parse::<Color>(), Ok(Color::Purple));

        let err = "green".parse::<Color>().unwrap_err();
        assert_eq!(err.to_string(), "invalid soloon color: green");
    }

    #[test]
    fn polyanet_body_has_three_fields() {
        let body = body_json(Entity::polyanet(1, 2));
        assert_eq!(body, json!({"row": 1, "column": 2, "candidateId": "candidate"}));
        assert_eq!(body.as_object().unwrap().len(), 3);
    }

    #[test]
    fn cometh_and_soloon_bodies_have_four_fields() {
        let cometh = body_json(Entity::cometh(0, 3, Direction::Left));
        assert_eq!(cometh.as_object().unwrap().len(), 4);
        assert_eq!(cometh["direction"], "left");

        let soloon = body_json(Entity::soloon(4, 0, Color::Blue));
        assert_eq!(soloon.as_object().unwrap().len(), 4);
        assert_eq!(soloon["color"], "blue");
    }

    #[test]
    fn resource_paths() {
        assert_eq!(Entity::polyanet(0, 0).resource_path(), "/polyanets");
        assert_eq!(Entity::cometh(0, 0, Direction::Up).resource_path(), "/comeths");
        assert_eq!(Entity::soloon(0, 0, Color::Red).resource_path(), "/soloons");
        assert_eq!(
            Entity::delete_target(Position::new(3, 4)).resource_path(),
            "/polyanets"
        );
    }

    #[test]
    fn display_names_kind_and_position() {
        assert_eq!(Entity::polyanet(1, 2).to_string(), "polyanet at (1, 2)");
        assert_eq!(
            Entity::cometh(0, 1, Direction::Down).to_string(),
            "down cometh at (0, 1)"
        );
        assert_eq!(
            Entity::soloon(2, 2, Color::Red).to_string(),
            "red soloon at (2, 2)"
        );
    }

    #[test]
    fn delete_target_body_carries_position_only() {
        let body = Entity::delete_target(Position::new(3, 4)).request_body("cand");
        assert_eq!(body.direction, None);
        assert_eq!(body.color, None);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"row": 3, "column": 4, "candidateId": "cand"})
        );
    }
}
