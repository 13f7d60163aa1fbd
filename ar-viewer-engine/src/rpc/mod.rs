//! JSON-RPC 2.0 link between the viewer and its host page.
//!
//! The engine runs inside an iframe. The host page pushes content records,
//! forwards WebXR/marker tracking data and drives the AR toggle; the engine
//! answers requests and pushes status notifications via `postMessage`.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (parent window)  <──postMessage──>  Viewer (iframe)
//!        │                                          │
//!        ├─ load_content / enter_ar (with ID) ─────>│
//!        │ <──────────────────── Response (with ID) ┤
//!        ├─ xr_session / xr_frame / xr_anchor ─────>│  HostTrackingBridge
//!        │ <──────── xr_request_session, xr_* ──────┤
//!        │ <──────── viewer_status / viewer_error ──┤
//! ```
//!
//! ## Requests
//!
//! - `load_content {record}`: show a published model record
//! - `enter_ar`, `exit_ar`: toggle AR presentation
//! - `reset_transform`: restore the model's initial transform
//! - `set_interaction {allow}`: enable or disable gestures
//! - `retry`: retry a failed model load or a denied camera permission
//! - `get_status`: current `ViewerStatus` snapshot
//!
//! Tracking messages (`xr_*`) are accepted with or without an id.
//!
//! ## Notifications
//!
//! - `viewer_status`: status snapshot, sent when it changes
//! - `viewer_error`: user-facing error (`category`, `message`, `retryable`)
//! - `selection_changed {selected}`
//! - `content_requested {id}`: the page route named a content record
//! - `ar_mode_changed {mode, strategy}`
//!
//! ## Error Handling
//!
//! - `-32700`: Parse error
//! - `-32600`: Invalid request
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error

/// Message listener, request dispatch and outgoing queue.
pub mod web_rpc;
