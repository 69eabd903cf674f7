//! Frame timing.
//!
//! One `FrameClock` per render loop; `tick()` once per presented frame.
//! `FpsCounter` feeds the window title.

mod fps;
mod frame_clock;

pub use fps::{title_with_fps, FpsCounter};
pub use frame_clock::{FrameClock, FrameTime};
