//! Runtime reporting systems.
//!
//! Builds the viewer status snapshot and keeps the host page informed
//! through RPC notifications.

/// Status snapshot, `viewer_status` / `viewer_error` notifications and
/// forwarding of tracking requests to the host.
pub mod status_notifications;
