/// Milliseconds on the host's monotonic clock (`performance.now()` in the browser).
pub type Millis = f64;

/// Frame-rate cap.
/// Admits a frame only when at least `ms_per_frame` has passed since the last
/// admitted one. Frames slower than the cap are always admitted, never batched.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    fps: f32,
    ms_per_frame: Millis,
    last_frame: Millis,
}

impl FrameLimiter {
    pub fn new(fps: f32) -> Self {
        let mut limiter = Self {
            fps,
            ms_per_frame: 0.0,
            last_frame: 0.0,
        };
        limiter.set_fps(fps);
        limiter
    }

    /// Change the cap. The interval is truncated to whole milliseconds.
    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
        self.ms_per_frame = if fps > 0.0 { (1000.0 / fps as f64).floor() } else { 0.0 };
    }

    /// Returns true if a frame at `frame_time` should be rendered.
    pub fn admit(&mut self, frame_time: Millis) -> bool {
        if frame_time - self.last_frame < self.ms_per_frame {
            return false;
        }
        self.last_frame = frame_time;
        true
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn ms_per_frame(&self) -> Millis {
        self.ms_per_frame
    }
}

/// One-shot timer that can be pushed back (debounce).
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Millis>,
}

impl Deadline {
    pub fn is_pending(&self) -> bool {
        self.at.is_some()
    }

    /// Arm (or re-arm) the timer to fire at `at`.
    pub fn arm(&mut self, at: Millis) {
        self.at = Some(at);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// Fixed-interval schedule for background passes (GC sweep).
#[derive(Debug, Clone)]
pub struct Interval {
    period: Millis,
    next: Millis,
}

impl Interval {
    /// The first pass is due immediately.
    pub fn new(period: Millis) -> Self {
        Self { period, next: 0.0 }
    }

    /// Returns true if a pass is due at `now`, and schedules the next one.
    pub fn due(&mut self, now: Millis) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.period;
        true
    }
}
