//! Engine lifecycle and the contract between the runtime and applications.
//!
//! `Engine` is the platform-facing object: `init`, `reshape`, `render` and
//! `cleanup`, callable only in lifecycle order. It owns the render device, the
//! resource registry, the scene and the deferred renderer.

mod app;
mod engine;
mod lifecycle;

pub use app::{App, AppControl};
pub use engine::Engine;
pub use lifecycle::Lifecycle;

pub use crate::render::FrameReport;
