//! Error taxonomy for the viewer.
//!
//! Capability and tracking problems degrade automatically and are only
//! logged. Asset, permission and content problems reach the user through
//! [`UserFacingError`], which the RPC layer forwards as `viewer_error`.

use bevy::prelude::Event;
use serde::Serialize;
use thiserror::Error;

/// The immersive capability query could not give an answer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapabilityError {
    #[error("environment tracking API is not available")]
    ApiUnavailable,

    #[error("capability query failed: {0}")]
    QueryFailed(String),

    #[error("capability query timed out after {0:.1}s")]
    TimedOut(f64),
}

/// Failures while loading a model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// Transport failure; the caller may retry.
    #[error("could not fetch {url}: {reason}")]
    Network { url: String, reason: String },

    /// The data was fetched but is not a valid model.
    #[error("invalid model at {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("unsupported model format '{extension}' for {url}")]
    UnsupportedFormat { url: String, extension: String },
}

impl AssetError {
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Camera acquisition failures in fallback mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera was found")]
    NotFound,

    #[error("camera capture is not supported here")]
    Unsupported,

    #[error("camera failed: {0}")]
    Other(String),
}

/// Tracking session failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingError {
    #[error("tracking access was denied")]
    PermissionDenied,

    #[error("tracking session type is unsupported")]
    Unsupported,

    #[error("tracking session was terminated")]
    Terminated,
}

/// Anchor creation failures. `Unsupported` degrades to pose-lock placement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnchorError {
    #[error("anchors are not supported by this platform")]
    Unsupported,

    #[error("anchor creation failed: {0}")]
    Failed(String),
}

/// Why a placement gesture did not anchor the model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("the current session does not accept placement")]
    NotPlaceable,

    #[error("no surface under the reticle")]
    NoSurface,

    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

/// Problems with the content record or viewer route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("'{0}' is not a valid content identifier")]
    InvalidId(String),

    #[error("content {0} is not publicly viewable")]
    NotPublic(String),

    #[error("content {0} has no model")]
    MissingModelUrl(String),

    #[error("content {id} points at an unsupported model URL '{url}'")]
    UnsupportedModelUrl { id: String, url: String },
}

/// Invalid runtime configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("scale limits must satisfy 0 < min <= max (got {min}..{max})")]
    InvalidScaleLimits { min: f32, max: f32 },

    #[error("{name} must be a positive finite number (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("easing must be in (0, 1] (got {0})")]
    InvalidEasing(f32),
}

/// Any error the viewer can surface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViewerError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("no AR strategy is available on this device")]
    NoStrategyAvailable,
}

/// Error as presented to the user and the host page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub category: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// An error raised by any system, reported to the host by the status layer.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ViewerErrorEvent(pub ViewerError);

impl ViewerErrorEvent {
    pub fn new(error: impl Into<ViewerError>) -> Self {
        Self(error.into())
    }
}

impl ViewerError {
    /// Stable category string for the host UI.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Capability(_) => "capability_unavailable",
            Self::Asset(AssetError::Network { .. }) => "asset_network",
            Self::Asset(AssetError::Malformed { .. }) => "asset_invalid",
            Self::Asset(AssetError::UnsupportedFormat { .. }) => "asset_unsupported",
            Self::Camera(CameraError::PermissionDenied) => "camera_permission_denied",
            Self::Camera(CameraError::NotFound) => "camera_not_found",
            Self::Camera(CameraError::Unsupported) => "camera_unsupported",
            Self::Camera(CameraError::Other(_)) => "camera_failed",
            Self::Tracking(TrackingError::PermissionDenied) => "tracking_permission_denied",
            Self::Tracking(TrackingError::Unsupported) => "capability_unavailable",
            Self::Tracking(TrackingError::Terminated) => "session_terminated",
            Self::Content(ContentError::InvalidId(_)) => "invalid_content_id",
            Self::Content(ContentError::NotPublic(_)) => "content_not_public",
            Self::Content(ContentError::MissingModelUrl(_)) => "content_missing_model",
            Self::Content(ContentError::UnsupportedModelUrl { .. }) => "content_invalid_model_url",
            Self::NoStrategyAvailable => "ar_unavailable",
        }
    }

    /// Whether the user can recover with a retry action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Asset(err) => err.is_retryable(),
            Self::Camera(CameraError::PermissionDenied | CameraError::Other(_)) => true,
            Self::Tracking(TrackingError::PermissionDenied) => true,
            _ => false,
        }
    }

    /// Whether this error is shown to the user rather than only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            Self::Capability(_) | Self::Tracking(TrackingError::Unsupported | TrackingError::Terminated)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Asset(AssetError::Network { .. }) => {
                "Could not load the model. Check your connection and try again.".to_string()
            }
            Self::Asset(AssetError::Malformed { .. }) => "This model is invalid and cannot be shown.".to_string(),
            Self::Asset(AssetError::UnsupportedFormat { extension, .. }) => {
                format!("Models in '{extension}' format are not supported.")
            }
            Self::Camera(CameraError::PermissionDenied) | Self::Tracking(TrackingError::PermissionDenied) => {
                "Allow camera access to view this model in AR.".to_string()
            }
            Self::Camera(CameraError::NotFound) => "No camera was found on this device.".to_string(),
            Self::Camera(CameraError::Unsupported) => {
                "This browser cannot open the camera. You can still view the model in 3D.".to_string()
            }
            Self::NoStrategyAvailable => "AR is not available on this device. You can still view the model in 3D.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_user_facing(&self) -> UserFacingError {
        UserFacingError {
            category: self.category(),
            message: self.user_message(),
            retryable: self.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_errors_have_distinct_categories() {
        let categories = [
            ViewerError::from(CameraError::PermissionDenied).category(),
            ViewerError::from(CameraError::NotFound).category(),
            ViewerError::from(CameraError::Unsupported).category(),
        ];
        assert_eq!(categories[0], "camera_permission_denied");
        assert_ne!(categories[0], categories[1]);
        assert_ne!(categories[1], categories[2]);
        assert_ne!(categories[0], categories[2]);
    }

    #[test]
    fn only_network_asset_errors_are_retryable() {
        let network = ViewerError::from(AssetError::network("https://x/a.glb", "offline"));
        let malformed = ViewerError::from(AssetError::malformed("https://x/a.glb", "bad magic"));
        assert!(network.is_retryable());
        assert!(!malformed.is_retryable());
        assert_ne!(network.user_message(), malformed.user_message());
    }

    #[test]
    fn capability_problems_stay_silent() {
        assert!(!ViewerError::from(CapabilityError::ApiUnavailable).is_user_visible());
        assert!(!ViewerError::from(TrackingError::Terminated).is_user_visible());
        assert!(ViewerError::from(TrackingError::PermissionDenied).is_user_visible());

        let facing = ViewerError::from(CameraError::PermissionDenied).to_user_facing();
        assert!(facing.retryable);
        assert!(facing.message.contains("Allow camera access"));
    }
}
