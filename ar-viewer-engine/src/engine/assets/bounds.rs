use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of a model in its own coordinate space.
/// Used for centering the model on its anchor and fitting its size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ModelBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Smallest bounds containing every point, or `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The eight corners, for transforming bounds through a matrix.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        // corners() always yields eight points
        Self::from_points(self.corners().map(|c| matrix.transform_point3(c))).unwrap_or(*self)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn largest_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Offset that puts the model's base centre at the local origin, so it
    /// sits on the anchored surface instead of intersecting it.
    pub fn placement_offset(&self) -> Vec3 {
        let center = self.center();
        Vec3::new(-center.x, -self.min.y, -center.z)
    }

    /// Uniform scale that fits the largest dimension to `target_size`.
    /// Degenerate bounds keep their native size.
    pub fn fit_scale(&self, target_size: f32) -> f32 {
        let largest = self.largest_dimension();
        if largest.is_finite() && largest > f32::EPSILON && target_size > 0.0 {
            target_size / largest
        } else {
            1.0
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_offset_puts_base_on_origin() {
        let bounds = ModelBounds::new(Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, 4.0, 2.0));
        let offset = bounds.placement_offset();
        assert_eq!(offset, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!((bounds.min + offset).y, 0.0);
    }

    #[test]
    fn fit_scale_targets_largest_dimension() {
        let bounds = ModelBounds::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 0.5));
        assert!((bounds.fit_scale(0.5) - 0.25).abs() < 1e-6);

        let flat = ModelBounds::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(flat.fit_scale(0.5), 1.0);
    }

    #[test]
    fn transformed_bounds_follow_rotation() {
        let bounds = ModelBounds::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let quarter_turn = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let rotated = bounds.transformed(&quarter_turn);
        assert!((rotated.size() - Vec3::new(1.0, 1.0, 2.0)).abs().max_element() < 1e-5);
    }
}
