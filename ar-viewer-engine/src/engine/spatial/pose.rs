use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Placement of an object in world space.
///
/// Poses are immutable snapshots: producers replace them wholesale every frame.
/// `scale` stays `Vec3::ONE` for tracked surfaces; marker poses may carry one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            scale: Vec3::ONE,
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Decompose an affine matrix into scale, rotation and translation.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, orientation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            orientation: orientation.normalize(),
            scale,
        }
    }

    /// Decompose a column-major matrix as delivered by WebXR.
    pub fn from_cols_array(cols: &[f32; 16]) -> Self {
        Self::from_matrix(Mat4::from_cols_array(cols))
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.orientation,
            scale: self.scale,
        }
    }

    /// True when every component is finite and the orientation is usable.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.scale.is_finite()
            && self.orientation.length_squared() > f32::EPSILON
    }
}

impl From<Transform> for Pose {
    fn from(transform: Transform) -> Self {
        Self {
            position: transform.translation,
            orientation: transform.rotation,
            scale: transform.scale,
        }
    }
}

/// Wire form of a pose as sent by the host page.
///
/// Either a full column-major `matrix`, or `position` plus `orientation`
/// (`[x, y, z, w]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PoseMessage {
    Matrix { matrix: [f32; 16] },
    Components {
        position: [f32; 3],
        #[serde(default = "identity_orientation")]
        orientation: [f32; 4],
    },
}

fn identity_orientation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl PoseMessage {
    pub fn to_pose(&self) -> Pose {
        match self {
            Self::Matrix { matrix } => Pose::from_cols_array(matrix),
            Self::Components {
                position,
                orientation,
            } => Pose::new(
                Vec3::from_array(*position),
                Quat::from_array(*orientation).normalize(),
            ),
        }
    }
}

impl From<&Pose> for PoseMessage {
    fn from(pose: &Pose) -> Self {
        Self::Components {
            position: pose.position.to_array(),
            orientation: pose.orientation.to_array(),
        }
    }
}
