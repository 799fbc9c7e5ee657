//! # Foldlens Protocols
//!
//! Shared data definitions for the foldlens render/audit service.
//! Contains types and the error taxonomy only - no engine or I/O code.
//!
//! ## Core Types
//!
//! - [`DeviceProfile`] - Emulated mobile device (viewport, pixel ratio, UA)
//! - [`Rect`] / [`RectKind`] / [`RectSets`] - Viewport-clipped content rects
//! - [`CoverageGrid`] - Fixed-resolution fold rasterizer
//! - [`RenderRequest`] / [`RenderReport`] - Wire types for `POST /render`
//! - [`Stage`] / [`StageTimings`] - Pipeline stages and their durations
//! - [`RenderError`] - Error taxonomy the API maps onto HTTP statuses

pub mod device;
pub mod error;
pub mod geometry;
pub mod render;

pub use device::{DeviceProfile, Viewport, all_devices, default_device, find_device, resolve_device};
pub use error::RenderError;
pub use geometry::{CoverageGrid, GRID_COLS, GRID_ROWS, Rect, RectKind, RectSets};
pub use render::{
    DebugArtifacts, OverlayCandidate, OverlayDebug, OverlayReason, RenderOptions, RenderReport,
    RenderRequest, Stage, StageTimings, UxAudit,
};
