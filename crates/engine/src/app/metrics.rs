use std::time::{Duration, Instant};

/// Loop timing summary for one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStatsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub avg_frame_ms: f32,
    pub worst_frame_ms: f32,
    pub clamp_events: u32,
}

#[derive(Debug)]
pub(crate) struct LoopStats {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    worst_frame: Duration,
    clamp_events: u32,
}

impl LoopStats {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            worst_frame: Duration::ZERO,
            clamp_events: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
        self.worst_frame = self.worst_frame.max(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Counts frames where the tick cap dropped simulation backlog.
    pub(crate) fn record_clamp(&mut self) {
        self.clamp_events = self.clamp_events.saturating_add(1);
    }

    /// Emits a snapshot once the interval has elapsed and starts a new one.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopStatsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let avg_frame_ms = if self.frames == 0 {
            0.0
        } else {
            self.frame_time_sum.as_secs_f32() * 1000.0 / self.frames as f32
        };
        let snapshot = LoopStatsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            avg_frame_ms,
            worst_frame_ms: self.worst_frame.as_secs_f32() * 1000.0,
            clamp_events: self.clamp_events,
        };
        *self = Self::new(self.interval, now);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_rates_and_frame_times() {
        let base = Instant::now();
        let mut stats = LoopStats::new(Duration::from_secs(1), base);
        stats.record_frame(Duration::from_millis(10));
        stats.record_frame(Duration::from_millis(30));
        for _ in 0..6 {
            stats.record_tick();
        }
        stats.record_clamp();

        let snapshot = stats
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("snapshot");
        assert!((snapshot.fps - 1.0).abs() < 0.01);
        assert!((snapshot.tps - 3.0).abs() < 0.01);
        assert!((snapshot.avg_frame_ms - 20.0).abs() < 0.01);
        assert!((snapshot.worst_frame_ms - 30.0).abs() < 0.01);
        assert_eq!(snapshot.clamp_events, 1);
    }

    #[test]
    fn nothing_emitted_inside_interval() {
        let base = Instant::now();
        let mut stats = LoopStats::new(Duration::from_secs(1), base);
        stats.record_frame(Duration::from_millis(16));
        assert!(stats
            .maybe_snapshot(base + Duration::from_millis(999))
            .is_none());
    }

    #[test]
    fn snapshot_resets_counters() {
        let base = Instant::now();
        let mut stats = LoopStats::new(Duration::from_secs(1), base);
        stats.record_frame(Duration::from_millis(16));
        stats.record_clamp();
        let first = base + Duration::from_secs(1);
        assert!(stats.maybe_snapshot(first).is_some());

        let second = stats
            .maybe_snapshot(first + Duration::from_secs(1))
            .expect("snapshot");
        assert_eq!(second.fps, 0.0);
        assert_eq!(second.avg_frame_ms, 0.0);
        assert_eq!(second.clamp_events, 0);
    }
}
