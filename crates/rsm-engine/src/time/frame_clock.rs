use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Timestamp the tick was taken at.
    pub now: Instant,

    /// Monotonic frame counter, starting at zero.
    pub frame_index: u64,
}

/// Produces clamped `FrameTime` snapshots for one render loop.
///
/// The upper clamp keeps the simulation stable after stalls (debugger pauses,
/// window drags, minimized windows). The lower clamp avoids a zero step from
/// back-to-back ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub const DEFAULT_DT_MIN: Duration = Duration::from_micros(100);
    pub const DEFAULT_DT_MAX: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a clock whose first tick is measured from `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            last: start,
            frame_index: 0,
            dt_min: Self::DEFAULT_DT_MIN,
            dt_max: Self::DEFAULT_DT_MAX,
        }
    }

    pub fn with_clamps(mut self, dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        self.dt_min = dt_min;
        self.dt_max = dt_max;
        self
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Moves the baseline to now without producing a frame.
    ///
    /// Call after long suspensions or surface reconfiguration.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    ///
    /// Timestamps earlier than the previous tick count as a zero step and are
    /// then raised to the lower clamp.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
