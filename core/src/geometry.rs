use serde::{Deserialize, Serialize};

/// Continuous position on the battlefield measured in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
}

impl WorldPoint {
    /// Origin of the battlefield.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the point.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate of the point.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Squared euclidean distance between two points.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Reports whether `other` lies within `radius` of this point, inclusive.
    #[must_use]
    pub fn within(self, other: Self, radius: f32) -> bool {
        self.distance_squared(other) <= radius * radius
    }

    /// Moves from this point towards `target` by at most `max_step` units.
    ///
    /// The target is returned unchanged once it is closer than the step.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: f32) -> Self {
        let distance = self.distance(target);
        if distance <= max_step || distance <= f32::EPSILON {
            return target;
        }
        let scale = max_step.max(0.0) / distance;
        Self::new(
            self.x + (target.x - self.x) * scale,
            self.y + (target.y - self.y) * scale,
        )
    }

    /// Offsets this point by the provided deltas.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Clamps `self` so it lies no further than `radius` from `center`.
    #[must_use]
    pub fn clamped_around(self, center: Self, radius: f32) -> Self {
        let distance = center.distance(self);
        if distance <= radius || distance <= f32::EPSILON {
            return self;
        }
        center.move_towards(self, radius.max(0.0))
    }
}
