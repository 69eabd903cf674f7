//! RSM engine crate.
//!
//! Deferred shading with a reflective-shadow-map one-bounce indirect pass.
//! This crate owns the resource registry, the shader program builder, the
//! render passes and the platform/GPU runtime that drives them.

pub mod assets;
pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod time;
pub mod window;

pub use config::EngineConfig;
pub use core::{Engine, FrameReport, Lifecycle};
pub use error::{EngineError, Result};
