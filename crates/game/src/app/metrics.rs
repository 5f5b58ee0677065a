use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopMetricsSnapshot {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) frame_time_ms: f32,
    /// Primitives drawn by the last frame.
    pub(crate) draw_calls: usize,
}

/// Frame and tick rates over a fixed interval. Timestamps are offsets from the
/// start of the run so a simulated clock works as well as the wall clock.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Duration,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    last_draw_calls: usize,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Duration::ZERO,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            last_draw_calls: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, draw_calls: usize) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
        self.last_draw_calls = draw_calls;
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Duration) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_sub(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            draw_calls: self.last_draw_calls,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));

        accumulator.record_frame(Duration::from_millis(16), 40);
        accumulator.record_frame(Duration::from_millis(16), 42);
        for _ in 0..4 {
            accumulator.record_tick();
        }

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert_eq!(snapshot.draw_calls, 42);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16), 0);

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn interval_restarts_after_snapshot() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_tick();
        assert!(accumulator.maybe_snapshot(Duration::from_secs(1)).is_some());
        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(1500))
            .is_none());
        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(2))
            .expect("second interval");
        assert_eq!(snapshot.tps, 0.0);
    }
}
