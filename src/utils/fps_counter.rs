/// Frames-per-second over one-second windows of scene time.
///
/// Fed with frame timestamps rather than reading a clock, so simulated time
/// from `tick_at` produces meaningful rates.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Option<f64>,
    frames: u32,
    current: f32,
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `time` seconds. Returns the new rate when a window closes.
    pub fn record(&mut self, time: f64) -> Option<f32> {
        // The opening frame only marks the window; frames count intervals.
        let Some(start) = self.window_start else {
            self.window_start = Some(time);
            return None;
        };
        self.frames += 1;

        let elapsed = time - start;
        if elapsed >= 1.0 {
            self.current = (f64::from(self.frames) / elapsed) as f32;
            self.window_start = Some(time);
            self.frames = 0;
            return Some(self.current);
        }
        None
    }

    /// Rate as of the last closed window.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_frames_per_second() {
        let mut fps = FpsCounter::new();
        let mut reported = None;
        for frame in 0..=60 {
            if let Some(rate) = fps.record(f64::from(frame) / 60.0) {
                reported = Some(rate);
            }
        }
        let rate = reported.unwrap();
        assert!((rate - 60.0).abs() < 1e-3);
        assert!((fps.current() - rate).abs() < f32::EPSILON);
    }

    #[test]
    fn closing_frame_opens_the_next_window() {
        let mut fps = FpsCounter::new();
        assert_eq!(fps.record(0.0), None);
        assert_eq!(fps.record(0.5), None);
        assert_eq!(fps.record(1.0), Some(2.0));
        assert_eq!(fps.record(1.5), None);
        assert_eq!(fps.record(2.0), Some(2.0));
    }
}
