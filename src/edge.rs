//! Compass edges of a stamp and the axes they measure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Measurement axis. Top and bottom edges carry the horizontal gauge,
/// left and right the vertical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// The two edges whose perforations run along this axis
    pub fn edges(self) -> [Edge; 2] {
        match self {
            Axis::Horizontal => [Edge::Top, Edge::Bottom],
            Axis::Vertical => [Edge::Left, Edge::Right],
        }
    }
}

/// One of the four sides of a stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    /// All edges in compass order
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    pub fn axis(self) -> Axis {
        match self {
            Edge::Top | Edge::Bottom => Axis::Horizontal,
            Edge::Left | Edge::Right => Axis::Vertical,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }

    /// True when moving into the stamp increases the perpendicular
    /// coordinate (top and left edges).
    pub fn inward_is_increasing(self) -> bool {
        matches!(self, Edge::Top | Edge::Left)
    }

    /// Coordinate running along the edge
    pub fn along(self, x: f32, y: f32) -> f32 {
        match self.axis() {
            Axis::Horizontal => x,
            Axis::Vertical => y,
        }
    }

    /// Coordinate perpendicular to the edge
    pub fn across(self, x: f32, y: f32) -> f32 {
        match self.axis() {
            Axis::Horizontal => y,
            Axis::Vertical => x,
        }
    }

    /// Inverse of [`Edge::along`] / [`Edge::across`]
    pub fn to_xy(self, along: f32, across: f32) -> (f32, f32) {
        match self.axis() {
            Axis::Horizontal => (along, across),
            Axis::Vertical => (across, along),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_edges_round_trip() {
        for edge in Edge::ALL {
            assert!(edge.axis().edges().contains(&edge));
        }
    }

    #[test]
    fn test_coordinate_swap() {
        assert_eq!(Edge::Left.along(3.0, 7.0), 7.0);
        assert_eq!(Edge::Left.across(3.0, 7.0), 3.0);
        assert_eq!(Edge::Left.to_xy(7.0, 3.0), (3.0, 7.0));
        assert_eq!(Edge::Bottom.to_xy(7.0, 3.0), (7.0, 3.0));
    }
}
