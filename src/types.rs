//! Shared identifiers and geometry used across the system.

use serde::Deserialize;

/// Dense identifier of a part; indexes the catalog's part table.
pub type PartId = usize;
/// Identifier of a product as written in the catalog source.
pub type ProductId = u64;
/// Identifier of a delivery order.
pub type OrderId = u32;

/// A point in the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Coordinates2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinates2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Coordinates2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Pose of the unit: planar coordinates plus heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Position {
    #[serde(flatten)]
    pub coords: Coordinates2D,
    #[serde(default)]
    pub yaw: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            coords: Coordinates2D::new(x, y),
            yaw,
        }
    }

    /// Position at `coords` with the heading reset to zero.
    pub const fn at(coords: Coordinates2D) -> Self {
        Self { coords, yaw: 0.0 }
    }
}
