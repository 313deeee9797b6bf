use std::time::{Duration, Instant};

use crate::map::RenderStats;

/// Loop rates and map draw volume averaged over one logging window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FrameStatsSnapshot {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) frame_time_ms: f32,
    /// Averages over frames where the scene reported render stats.
    pub(crate) tiles_visited_per_frame: f32,
    pub(crate) tiles_drawn_per_frame: f32,
    /// Presented frames for which the scene reported no stats.
    pub(crate) frames_without_stats: u32,
}

#[derive(Debug, Default)]
struct WindowTotals {
    frames: u32,
    ticks: u32,
    frame_time: Duration,
    stats_frames: u32,
    tiles_visited: u64,
    tiles_drawn: u64,
}

impl WindowTotals {
    fn summarize(&self, elapsed: Duration) -> FrameStatsSnapshot {
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let per_frame = |total: f32, frames: u32| {
            if frames == 0 {
                0.0
            } else {
                total / frames as f32
            }
        };
        FrameStatsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms: per_frame(self.frame_time.as_secs_f32() * 1000.0, self.frames),
            tiles_visited_per_frame: per_frame(self.tiles_visited as f32, self.stats_frames),
            tiles_drawn_per_frame: per_frame(self.tiles_drawn as f32, self.stats_frames),
            frames_without_stats: self.frames - self.stats_frames,
        }
    }
}

/// Fixed-length window that collects ticks, frames and tile counts, then
/// closes into a [`FrameStatsSnapshot`] and starts over.
#[derive(Debug)]
pub(crate) struct FrameStatsWindow {
    opened_at: Instant,
    length: Duration,
    totals: WindowTotals,
}

impl FrameStatsWindow {
    pub(crate) fn new(length: Duration, now: Instant) -> Self {
        Self {
            opened_at: now,
            length,
            totals: WindowTotals::default(),
        }
    }

    pub(crate) fn record_tick(&mut self) {
        self.totals.ticks = self.totals.ticks.saturating_add(1);
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, stats: Option<RenderStats>) {
        let totals = &mut self.totals;
        totals.frames = totals.frames.saturating_add(1);
        totals.frame_time = totals.frame_time.saturating_add(frame_dt);
        if let Some(stats) = stats {
            totals.stats_frames = totals.stats_frames.saturating_add(1);
            totals.tiles_visited += stats.tiles_visited as u64;
            totals.tiles_drawn += stats.tiles_drawn as u64;
        }
    }

    pub(crate) fn close_if_elapsed(&mut self, now: Instant) -> Option<FrameStatsSnapshot> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.length {
            return None;
        }
        let snapshot = self.totals.summarize(elapsed);
        self.totals = WindowTotals::default();
        self.opened_at = now;
        Some(snapshot)
    }
}
