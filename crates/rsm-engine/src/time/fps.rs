use std::time::{Duration, Instant};

/// Counts presented frames and reports a rate once per window.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
    last: Option<f32>,
}

impl FpsCounter {
    pub fn new(start: Instant) -> Self {
        Self::with_window(start, Duration::from_secs(1))
    }

    pub fn with_window(start: Instant, window: Duration) -> Self {
        Self {
            window,
            window_start: start,
            frames: 0,
            last: None,
        }
    }

    /// Records one frame. Returns the new rate when a window just closed.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        self.last = Some(fps);
        Some(fps)
    }

    /// Most recent completed measurement.
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}

/// Formats the window title shown while rendering.
pub fn title_with_fps(title: &str, fps: f32, width: u32, height: u32) -> String {
    format!("{title}: {fps:.0} FPS @ ({width}x{height})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_window() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);

        for i in 1..60 {
            assert_eq!(fps.frame(start + Duration::from_millis(i * 16)), None);
        }
        let rate = fps.frame(start + Duration::from_secs(1)).unwrap();
        assert!((rate - 60.0).abs() < 1e-3);
        assert_eq!(fps.last(), Some(rate));
    }

    #[test]
    fn counter_restarts_after_report() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        fps.frame(start + Duration::from_secs(1)).unwrap();
        assert_eq!(fps.frame(start + Duration::from_millis(1500)), None);
    }

    #[test]
    fn title_format() {
        assert_eq!(
            title_with_fps("RSM", 59.6, 1600, 900),
            "RSM: 60 FPS @ (1600x900)"
        );
    }
}
