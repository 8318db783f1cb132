//! # Sitelapse Engine
//!
//! Temporal normalization and windowing engine for the sitelapse viewer.
//! Turns irregularly-dated delivery records into gap-free availability
//! windows, renderer-agnostic scene packets, per-instant progress metrics,
//! and a bidirectional calendar/timeline binding.
//!
//! Data flow:
//!
//! ```text
//! upstream payload → normalize → window → scene packets → renderer
//! progress table   → progress  → per-instant query      → HUD
//! ```
//!
//! The calendar synchronizer sits alongside, reading and writing the
//! renderer clock through the ports in [`calendar`].

pub mod calendar;
pub mod fetch;
pub mod normalize;
pub mod progress;
pub mod scene;
pub mod store;
pub mod window;

pub use normalize::{AssetItem, AssetKind};
pub use progress::{ProgressQueryResult, ProgressTimeseries};
pub use window::Windowed;
